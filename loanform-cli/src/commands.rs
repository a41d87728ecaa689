//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::FormArgs;
use crate::output::StdoutContainer;
use loanform_core::config::workspace_config_path;
use loanform_core::payload::parse_field_pair;
use loanform_core::{
    FieldValue, HttpTransport, InMemoryForm, LoanApplication, LoanformConfig, PageEvent,
    SubmissionHandler, SubmissionReport,
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// Handle a CLI subcommand. `load_config` is called by the commands that
/// need a configuration.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    load_config: impl FnOnce() -> anyhow::Result<LoanformConfig>,
) -> anyhow::Result<()> {
    match command {
        Commands::Submit { form } => handle_submit(&form, &load_config()?).await,
        Commands::Listen { form } => handle_listen(&form, &load_config()?).await,
        Commands::Config { action } => handle_config(action, workspace, load_config),
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    load_config: impl FnOnce() -> anyhow::Result<LoanformConfig>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => init_config(workspace),
        ConfigAction::Show => {
            println!("{}", show_config(&load_config()?)?);
            Ok(())
        }
    }
}

fn show_config(config: &LoanformConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Write a default `.loanform/config.toml` unless one exists.
fn init_config(workspace: &Path) -> anyhow::Result<()> {
    let config_path = workspace_config_path(workspace);
    if config_path.exists() {
        println!(
            "Configuration file already exists at: {}",
            config_path.display()
        );
        return Ok(());
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let toml_str = toml::to_string_pretty(&LoanformConfig::default())?;
    std::fs::write(&config_path, &toml_str)?;
    println!(
        "Created default configuration at: {}",
        config_path.display()
    );
    Ok(())
}

/// Fill a form from an application file and `NAME=VALUE` / `NAME=PATH` arguments.
/// Arguments override fields the application already set.
fn build_form(args: &FormArgs, form_id: &str) -> anyhow::Result<InMemoryForm> {
    let form = match &args.application {
        Some(path) => {
            let application = LoanApplication::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load application: {}", e))?;
            InMemoryForm::from_application(form_id, &application)
        }
        None => InMemoryForm::new(form_id),
    };

    for pair in &args.fields {
        let (name, value) = parse_field_pair(pair)
            .ok_or_else(|| anyhow::anyhow!("Invalid field '{}', expected NAME=VALUE", pair))?;
        form.set_text(&name, value);
    }
    for pair in &args.files {
        let (name, path) = parse_field_pair(pair)
            .ok_or_else(|| anyhow::anyhow!("Invalid file '{}', expected NAME=PATH", pair))?;
        let value = FieldValue::file_from_path(Path::new(&path))
            .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", path, e))?;
        form.set(&name, value);
    }
    Ok(form)
}

fn install_handler(form: InMemoryForm, config: &LoanformConfig) -> anyhow::Result<SubmissionHandler> {
    let transport = HttpTransport::new(&config.endpoint)?;
    let container = StdoutContainer::new(config.page.result_id.clone());
    let handler = SubmissionHandler::install(
        config,
        Arc::new(form),
        Arc::new(container),
        Arc::new(transport),
    )?;
    Ok(handler)
}

async fn handle_submit(args: &FormArgs, config: &LoanformConfig) -> anyhow::Result<()> {
    let form = build_form(args, &config.page.form_id)?;
    let handler = install_handler(form, config)?;
    let report = handler.submit().await;
    tracing::debug!(
        submission = %report.submission_id,
        success = report.is_success(),
        "Submission finished"
    );
    Ok(())
}

async fn handle_listen(args: &FormArgs, config: &LoanformConfig) -> anyhow::Result<()> {
    let form = build_form(args, &config.page.form_id)?;
    let handler = Arc::new(install_handler(form, config)?);

    let (tx, rx) = mpsc::channel(32);
    let listener = tokio::spawn(Arc::clone(&handler).listen(rx));

    eprintln!("Listening: one line of NAME=VALUE pairs per submission, Ctrl-D to stop.");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let events = match line_events(&line) {
            Ok(Some(events)) => events,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("  {}", e);
                continue;
            }
        };
        for event in events {
            if tx.send(event).await.is_err() {
                anyhow::bail!("submit listener stopped unexpectedly");
            }
        }
    }
    drop(tx);

    let reports = listener.await?;
    eprintln!("{}", summarize(&reports));
    Ok(())
}

/// Turn one input line into the events it stands for: one input event per
/// pair, then a submit. Blank lines resubmit the form as it is; `#` lines
/// are ignored.
fn line_events(line: &str) -> anyhow::Result<Option<Vec<PageEvent>>> {
    let line = line.trim();
    if line.starts_with('#') {
        return Ok(None);
    }
    let mut events = Vec::new();
    for token in line.split_whitespace() {
        let (name, value) = parse_field_pair(token)
            .ok_or_else(|| anyhow::anyhow!("Invalid field '{}', expected NAME=VALUE", token))?;
        events.push(PageEvent::input(name, value));
    }
    events.push(PageEvent::submit());
    Ok(Some(events))
}

fn summarize(reports: &[SubmissionReport]) -> String {
    let predicted = reports.iter().filter(|r| r.is_success()).count();
    let discarded = reports.iter().filter(|r| !r.applied).count();
    format!(
        "{} submission(s): {} predicted, {} failed, {} discarded as stale",
        reports.len(),
        predicted,
        reports.len() - predicted,
        discarded
    )
}
