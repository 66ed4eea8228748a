//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use judgekit_core::report::{render_model_summary, write_report};
use judgekit_core::{
    EvaluationRunner, ModeRegistry, PromptVariables, Settings, create_backend,
    load_evaluation_config, load_settings,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Commands::RunEval {
            config_path,
            output,
            vars,
            judge_concurrency,
            no_input,
        } => {
            let options = RunOptions {
                output,
                vars,
                judge_concurrency,
                interactive: !no_input,
            };
            handle_run_eval(&config_path, options, workspace, cancel).await
        }
        Commands::Validate { config_path } => handle_validate(&config_path, workspace),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

struct RunOptions {
    output: Option<PathBuf>,
    vars: Vec<(String, String)>,
    judge_concurrency: Option<usize>,
    interactive: bool,
}

/// Parse a `KEY=VALUE` prompt variable.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Check that the config file exists and is YAML.
pub fn validate_config_file(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if !is_yaml {
        anyhow::bail!("Config file must be YAML format: {}", path.display());
    }
    Ok(())
}

pub fn print_success_message(message: &str) {
    println!("✅ {}", message);
}

/// One-line error text. Core errors already carry their causes in `Display`.
pub fn error_message(err: &anyhow::Error) -> String {
    err.to_string()
}

pub fn print_error_message(message: &str) {
    eprintln!("❌ {}", message);
}

fn load_workspace_settings(workspace: &Path) -> anyhow::Result<Settings> {
    let settings = load_settings(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
    for warning in settings.validate() {
        warn!("{}", warning);
    }
    Ok(settings)
}

/// Prompt variables the config needs but `known` does not supply.
///
/// Returns an empty list when the config does not load; the run reports that error.
fn missing_variables(config_path: &Path, known: &[(String, String)]) -> Vec<String> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let mut variables = PromptVariables::new().with_resolver(move |name| {
        recorder.lock().ok()?.push(name.to_string());
        Some(String::new())
    });
    for (name, value) in known {
        variables.insert(name.clone(), value.clone());
    }
    if load_evaluation_config(config_path, &mut variables).is_err() {
        return Vec::new();
    }
    seen.lock().map(|mut names| std::mem::take(&mut *names)).unwrap_or_default()
}

/// Ask for each name on a blocking thread. Unanswered names are left out.
async fn prompt_for_variables(names: Vec<String>) -> anyhow::Result<Vec<(String, String)>> {
    let answers = tokio::task::spawn_blocking(move || {
        names
            .into_iter()
            .filter_map(|name| {
                dialoguer::Input::<String>::new()
                    .with_prompt(format!("Enter value for {}", name))
                    .interact_text()
                    .ok()
                    .map(|value| (name, value))
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| anyhow::anyhow!("Prompting for variables failed: {}", e))?;
    Ok(answers)
}

async fn handle_run_eval(
    config_path: &Path,
    options: RunOptions,
    workspace: &Path,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    validate_config_file(config_path)?;

    let mut settings = load_workspace_settings(workspace)?;
    if let Some(n) = options.judge_concurrency {
        settings.evaluation.judge_concurrency = n;
    }

    let backend = create_backend(&settings.backend)
        .map_err(|e| anyhow::anyhow!("Failed to create backend: {}", e))?;
    let registry = ModeRegistry::standard(settings.evaluation.judge_concurrency);

    let mut vars = options.vars;
    if options.interactive {
        let missing = missing_variables(config_path, &vars);
        if !missing.is_empty() {
            vars.extend(prompt_for_variables(missing).await?);
        }
    }

    let runner = EvaluationRunner::new(config_path, backend, registry)
        .with_report_dir(&settings.report.output_dir)
        .with_output_path(options.output)
        .with_variables(vars)
        .with_cancellation(cancel);

    match runner.run().await {
        Ok(outcome) => {
            println!("{}", outcome.console_summary());
            println!("{}", render_model_summary(&outcome.model_summary()));
            print_success_message(&format!(
                "Evaluation completed. Results saved to {}",
                outcome.output_path.display()
            ));
            Ok(())
        }
        Err(err) => {
            if let Some(report) = &err.report {
                let fallback = std::env::temp_dir().join(
                    config_path
                        .file_name()
                        .map(|n| PathBuf::from(n).with_extension("json"))
                        .unwrap_or_else(|| PathBuf::from("judgekit-report.json")),
                );
                match write_report(report, &fallback).await {
                    Ok(()) => warn!(path = %fallback.display(), "Computed report saved to fallback location"),
                    Err(e) => {
                        warn!(error = %e, "Fallback save failed, printing report");
                        println!("{}", serde_json::to_string_pretty(report)?);
                    }
                }
            }
            Err(err.into())
        }
    }
}

fn handle_validate(config_path: &Path, workspace: &Path) -> anyhow::Result<()> {
    validate_config_file(config_path)?;
    let settings = load_workspace_settings(workspace)?;

    // Placeholders stay unrendered; only the structure is checked.
    let mut variables = PromptVariables::new().with_resolver(|name| Some(format!("{{{{ {} }}}}", name)));
    let config = load_evaluation_config(config_path, &mut variables)?;
    ModeRegistry::standard(settings.evaluation.judge_concurrency).get(config.mode())?;

    print_success_message(&format!(
        "Configuration is valid: mode {}, {} candidate(s), {} criterion/criteria, {} expected output(s)",
        config.mode(),
        config.candidates().len(),
        config.criteria().len(),
        config.expected_outputs().len()
    ));
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".judgekit");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Settings file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&Settings::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!("Created default settings at: {}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let mut settings = load_workspace_settings(workspace)?;
            if settings.backend.api_key.is_some() {
                settings.backend.api_key = Some("<redacted>".to_string());
            }
            let toml_str = toml::to_string_pretty(&settings)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
