//! Settings for judgekit.
//!
//! Uses `figment` for layered settings: defaults -> config file -> environment -> CLI args.
//! Settings are loaded from `~/.config/judgekit/config.toml` and/or `.judgekit/config.toml`
//! in the workspace directory. These are tool settings (backend, report location,
//! judge fan-out); what to evaluate lives in the per-run YAML configuration.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

/// Generation backend settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Provider name: "openai", "openai_compat", "azure".
    pub provider: String,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
        }
    }
}

impl BackendConfig {
    /// Resolve the API key: inline key first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.api_key_env.clone(),
            })
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where reports are written when no explicit output path is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Maximum judge calls in flight within one mode run. 1 means sequential.
    pub judge_concurrency: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            judge_concurrency: 1,
        }
    }
}

impl Settings {
    /// Return human-readable warnings for questionable values.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.evaluation.judge_concurrency == 0 {
            warnings.push("evaluation.judge_concurrency is 0; treating it as 1".to_string());
        }
        if let Some(url) = &self.backend.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!("backend.base_url '{}' is not an http(s) URL", url));
        }
        warnings
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "judgekit", "judgekit")
}

/// Directory for rolling log files, if a home directory can be determined.
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

/// Load settings by merging defaults, config files, and environment variables.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `JUDGEKIT_`)
/// 3. Workspace-local settings (`.judgekit/config.toml`)
/// 4. User settings (`~/.config/judgekit/config.toml`)
/// 5. Built-in defaults
pub fn load_settings(
    workspace: Option<&Path>,
    overrides: Option<&Settings>,
) -> Result<Settings, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".judgekit").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // JUDGEKIT_BACKEND__BASE_URL, JUDGEKIT_EVALUATION__JUDGE_CONCURRENCY, etc.
    figment = figment.merge(Env::prefixed("JUDGEKIT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any settings file exists (user-level or workspace-level).
pub fn settings_exist(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs()
        && dirs.config_dir().join("config.toml").exists()
    {
        return true;
    }

    workspace.is_some_and(|ws| ws.join(".judgekit").join("config.toml").exists())
}
