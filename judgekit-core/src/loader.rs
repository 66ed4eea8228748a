//! YAML input documents: evaluation config, prompt, and expected outputs.
//!
//! Relative file references inside a config resolve against the config
//! file's directory, falling back to the working directory when nothing
//! exists there.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::modes::ModeKind;
use crate::types::{CandidateSpec, Criterion, EvaluationConfig, ExpectedOutput, JudgeSpec, Prompt};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"));

/// Callback asked for variables that have no fixed value.
pub type VariableResolver = Box<dyn FnMut(&str) -> Option<String> + Send>;

/// Values for `{{ name }}` placeholders in a prompt template.
#[derive(Default)]
pub struct PromptVariables {
    values: HashMap<String, String>,
    resolver: Option<VariableResolver>,
}

impl PromptVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Ask `resolver` for any variable without a fixed value.
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: FnMut(&str) -> Option<String> + Send + 'static,
    {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn set_resolver(&mut self, resolver: VariableResolver) {
        self.resolver = Some(resolver);
    }

    /// Look up a value, asking the resolver once per missing name.
    pub fn lookup(&mut self, name: &str) -> Option<String> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        let resolver = self.resolver.as_mut()?;
        let value = resolver(name)?;
        self.values.insert(name.to_string(), value.clone());
        Some(value)
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }
}

impl From<HashMap<String, String>> for PromptVariables {
    fn from(values: HashMap<String, String>) -> Self {
        Self {
            values,
            resolver: None,
        }
    }
}

impl std::fmt::Debug for PromptVariables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptVariables")
            .field("values", &self.values)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Placeholder names in order of first appearance.
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute every placeholder. A name without a value is an error.
pub fn render_template(
    template: &str,
    values: &HashMap<String, String>,
) -> Result<String, ConfigError> {
    if let Some(missing) = extract_variables(template)
        .into_iter()
        .find(|name| !values.contains_key(name))
    {
        return Err(ConfigError::MissingVariable { name: missing });
    }
    let rendered = PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        values.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = read_file(path)?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    prompt_id: String,
    system_prompt: String,
    user_prompt: String,
}

/// Load a prompt file and render its user prompt.
pub fn load_prompt(path: &Path, variables: &mut PromptVariables) -> Result<Prompt, ConfigError> {
    let raw: RawPrompt = parse_yaml(path)?;

    let names = extract_variables(&raw.user_prompt);
    if names.is_empty() {
        return Ok(Prompt::new(raw.prompt_id, raw.system_prompt, raw.user_prompt));
    }

    let mut values = HashMap::with_capacity(names.len());
    for name in names {
        let value = variables
            .lookup(&name)
            .ok_or_else(|| ConfigError::MissingVariable { name: name.clone() })?;
        values.insert(name, value);
    }
    debug!(prompt_id = %raw.prompt_id, variables = values.len(), "Rendering prompt template");

    let user_text = render_template(&raw.user_prompt, &values)?;
    Ok(Prompt::new(raw.prompt_id, raw.system_prompt, user_text))
}

#[derive(Debug, Deserialize)]
struct RawExpectedOutputs {
    expected_responses: Vec<ExpectedOutput>,
}

/// Load an expected-output file.
pub fn load_expected_outputs(path: &Path) -> Result<Vec<ExpectedOutput>, ConfigError> {
    let raw: RawExpectedOutputs = parse_yaml(path)?;
    Ok(raw.expected_responses)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl OneOrMany {
    fn single(self, field: &str) -> Result<PathBuf, ConfigError> {
        match self {
            OneOrMany::One(path) => Ok(path),
            OneOrMany::Many(_) => Err(ConfigError::UnsupportedFileList {
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    mode: String,
    #[serde(default)]
    structured: bool,
    #[serde(default)]
    candidates: Vec<CandidateSpec>,
    judge: Option<JudgeSpec>,
    #[serde(default)]
    criteria: Vec<Criterion>,
    prompt_file: Option<OneOrMany>,
    expected_response_file: Option<OneOrMany>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

fn resolve_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    let beside_config = base.join(&path);
    if beside_config.exists() { beside_config } else { path }
}

/// Load an evaluation config and every document it references.
pub fn load_evaluation_config(
    path: &Path,
    variables: &mut PromptVariables,
) -> Result<EvaluationConfig, ConfigError> {
    let raw: RawConfig = parse_yaml(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mode: ModeKind = raw.mode.parse()?;
    let judge = raw.judge.ok_or_else(|| ConfigError::MissingField {
        field: "judge".to_string(),
    })?;

    let prompt_path = raw
        .prompt_file
        .ok_or_else(|| ConfigError::MissingField {
            field: "prompt_file".to_string(),
        })?
        .single("prompt_file")?;
    let prompt = load_prompt(&resolve_relative(base, prompt_path), variables)?;

    let expected_outputs = match raw.expected_response_file {
        Some(files) => {
            let expected_path = files.single("expected_response_file")?;
            load_expected_outputs(&resolve_relative(base, expected_path))?
        }
        None => Vec::new(),
    };

    let config = EvaluationConfig::builder(prompt, mode, judge)
        .structured(raw.structured)
        .candidates(raw.candidates)
        .criteria(raw.criteria)
        .expected_outputs(expected_outputs)
        .metadata(raw.metadata)
        .build()?;

    info!(
        path = %path.display(),
        mode = %config.mode(),
        candidates = config.candidates().len(),
        criteria = config.criteria().len(),
        expected_outputs = config.expected_outputs().len(),
        "Loaded evaluation config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quality;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extract_variables_in_order_without_duplicates() {
        let names = extract_variables("Trip to {{ city }} for {{days}} days. {{ city }} again.");
        assert_eq!(names, ["city", "days"]);
        assert!(extract_variables("no placeholders").is_empty());
    }

    #[test]
    fn test_render_template() {
        let values = HashMap::from([
            ("city".to_string(), "Lisbon".to_string()),
            ("days".to_string(), "2".to_string()),
        ]);
        let out = render_template("{{ city }}, {{days}} days", &values).unwrap();
        assert_eq!(out, "Lisbon, 2 days");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let err = render_template("{{ city }}", &HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable { name } if name == "city"));
    }

    #[test]
    fn test_resolver_is_asked_once_per_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut vars = PromptVariables::new().with_resolver(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("<{name}>"))
        });
        vars.insert("fixed", "yes");

        assert_eq!(vars.lookup("fixed").as_deref(), Some("yes"));
        assert_eq!(vars.lookup("city").as_deref(), Some("<city>"));
        assert_eq!(vars.lookup("city").as_deref(), Some("<city>"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_prompt_renders_user_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "prompt.yaml",
            "prompt_id: trip\nsystem_prompt: You plan {{ kind }} trips.\nuser_prompt: Plan {{ city }}.\n",
        );
        let mut vars = PromptVariables::from(HashMap::from([(
            "city".to_string(),
            "Porto".to_string(),
        )]));

        let prompt = load_prompt(&path, &mut vars).unwrap();
        assert_eq!(prompt.id, "trip");
        assert_eq!(prompt.user_text, "Plan Porto.");
        assert_eq!(prompt.system_text, "You plan {{ kind }} trips.");
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "prompt.yaml",
            "prompt_id: trip\nsystem_prompt: s\nuser_prompt: Plan {{ city }}.\n",
        );
        let err = load_prompt(&path, &mut PromptVariables::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable { .. }));
    }

    #[test]
    fn test_load_expected_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "expected.yaml",
            r#"
expected_responses:
  - quality: good
    description: covers everything
    response: A relaxed plan.
  - quality: 3
    response: A rushed plan.
"#,
        );
        let expected = load_expected_outputs(&path).unwrap();
        assert_eq!(expected.len(), 2);
        assert_eq!(expected[0].quality, Quality::Label("good".into()));
        assert_eq!(expected[1].quality, Quality::Score(3.0));
        assert!(expected[1].description.is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = load_expected_outputs(Path::new("/nonexistent/expected.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_config_paths_resolve_beside_config() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "prompt.yaml",
            "prompt_id: p1\nsystem_prompt: s\nuser_prompt: u\n",
        );
        let config_path = write(
            dir.path(),
            "eval.yaml",
            r#"
mode: reference_free
structured: true
candidates:
  - model: gpt-4o
    temperature: 0.5
judge:
  model: o3
  effort: high
criteria:
  - type: rubric
    name: pace
    question: Is the pace realistic?
    weight: 0.5
prompt_file: prompt.yaml
metadata:
  owner: travel
"#,
        );

        let config = load_evaluation_config(&config_path, &mut PromptVariables::new()).unwrap();
        assert_eq!(config.mode(), ModeKind::ReferenceFree);
        assert!(config.structured());
        assert_eq!(config.prompt().id, "p1");
        assert_eq!(config.candidates()[0].params.temperature, 0.5);
        assert_eq!(config.judge().model_id, "o3");
        assert_eq!(config.metadata().unwrap()["owner"], "travel");
        assert!(config.expected_outputs().is_empty());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write(
            dir.path(),
            "eval.yaml",
            "mode: pairwise\njudge:\n  model: o3\nprompt_file: prompt.yaml\n",
        );
        let err = load_evaluation_config(&config_path, &mut PromptVariables::new()).unwrap_err();
        assert!(err.to_string().contains("reference_free, ground_truth, comparison"));
    }

    #[test]
    fn test_prompt_file_required() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write(
            dir.path(),
            "eval.yaml",
            "mode: reference_free\njudge:\n  model: o3\n",
        );
        let err = load_evaluation_config(&config_path, &mut PromptVariables::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field } if field == "prompt_file"));
    }

    #[test]
    fn test_prompt_file_list_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write(
            dir.path(),
            "eval.yaml",
            "mode: reference_free\njudge:\n  model: o3\nprompt_file: [a.yaml, b.yaml]\n",
        );
        let err = load_evaluation_config(&config_path, &mut PromptVariables::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFileList { field } if field == "prompt_file"));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write(dir.path(), "eval.yaml", "mode: [unclosed\n");
        let err = load_evaluation_config(&config_path, &mut PromptVariables::new()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
