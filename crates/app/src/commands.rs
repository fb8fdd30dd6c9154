//! Command execution.
//!
//! Each command talks to the store and writes its result to `out`. Logs go
//! through tracing to stderr.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use hostvar_application::{HostResolver, MessageHandler, VariableStore, filter_variables_by_host};
use hostvar_domain::{Origin, Settings, Variable, VariableDraft};
use tracing::debug;

use crate::cli::{Command, SetArgs, SettingsAction};
use crate::error::{AppError, AppResult};

/// Runs one command against an opened store.
///
/// # Errors
///
/// Returns the first store, input or output failure.
pub async fn execute<W: Write>(
    command: Command,
    store: Arc<VariableStore>,
    data_path: &Path,
    out: &mut W,
) -> AppResult<()> {
    debug!(?command, "Executing command");
    match command {
        Command::Init => {
            writeln!(out, "Storage ready at {}", data_path.display())?;
        }
        Command::List { origin, json } => {
            let variables = match origin {
                Some(origin) => {
                    let origin = parse_origin(&origin)?;
                    let all = store.get_variables().await?;
                    filter_variables_by_host(&all, &origin.hostname, origin.port())
                }
                None => store.get_variables().await?,
            };
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&variables)?)?;
            } else {
                write_table(out, &variables)?;
            }
        }
        Command::Get { key } => {
            let variable = store
                .get_variable(&key)
                .await?
                .ok_or_else(|| AppError::UnknownKey(key))?;
            writeln!(out, "{}", variable.value)?;
        }
        Command::Set(args) => {
            let saved = store.save_variable(draft_from(args, &store).await?).await?;
            writeln!(out, "Saved {}", saved.key)?;
        }
        Command::Delete { key } => {
            if store.delete_variable(&key).await? {
                writeln!(out, "Deleted {key}")?;
            } else {
                return Err(AppError::UnknownKey(key));
            }
        }
        Command::Clear => {
            store.clear_variables().await?;
            writeln!(out, "Cleared all variables")?;
        }
        Command::Search { query } => {
            write_table(out, &store.search_variables(&query).await?)?;
        }
        Command::Export { full, output } => {
            let document = if full {
                store.export_data().await?
            } else {
                store.export_variables().await?
            };
            match output {
                Some(path) => {
                    write_file(&path, &document).await?;
                    writeln!(out, "Exported to {}", path.display())?;
                }
                None => write!(out, "{document}")?,
            }
        }
        Command::Import { file, merge, full } => {
            let text = read_input(file.as_deref()).await?;
            if full {
                let count = store.import_data(&text).await?;
                writeln!(out, "Restored {count} variables")?;
            } else {
                let summary = store.import_variables(&text, merge).await?;
                writeln!(
                    out,
                    "Imported {} variables ({} replaced, {} added)",
                    summary.imported, summary.replaced, summary.appended
                )?;
            }
        }
        Command::Resolve { origin, text } => {
            let origin = parse_origin(&origin)?;
            let text = match text {
                Some(text) => text,
                None => read_input(None).await?,
            };
            let result = HostResolver::new(store)
                .substitute(&text, &origin.hostname, origin.port())
                .await?;
            write!(out, "{}", result.text)?;
            if !result.text.ends_with('\n') {
                writeln!(out)?;
            }
        }
        Command::Settings { action } => {
            let settings = match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => store.get_settings().await?,
                SettingsAction::Reset => {
                    store.set_settings(Settings::default()).await?;
                    Settings::default()
                }
                SettingsAction::Set {
                    enabled,
                    theme,
                    trigger,
                    shortcut,
                    case_sensitive,
                } => {
                    let mut settings = store.get_settings().await?;
                    if let Some(enabled) = enabled {
                        settings.enabled = enabled;
                    }
                    if let Some(theme) = theme {
                        settings.theme = theme;
                    }
                    if let Some(trigger) = trigger {
                        settings.replacement_trigger = trigger;
                    }
                    if let Some(shortcut) = shortcut {
                        settings.shortcut_key = shortcut;
                    }
                    if let Some(case_sensitive) = case_sensitive {
                        settings.case_sensitive = case_sensitive;
                    }
                    store.set_settings(settings.clone()).await?;
                    settings
                }
            };
            write_settings(out, &settings)?;
        }
        Command::Toggle => {
            let enabled = store.toggle_enabled().await?;
            writeln!(
                out,
                "Substitution {}",
                if enabled { "enabled" } else { "disabled" }
            )?;
        }
        Command::Stats => {
            let stats = store.get_storage_stats().await?;
            let count = store.get_variables().await?.len();
            writeln!(out, "Variables: {count}")?;
            writeln!(out, "Used:      {} bytes", stats.bytes_in_use)?;
            writeln!(out, "Quota:     {} bytes", stats.quota)?;
        }
        Command::Message { json } => {
            let text = match json {
                Some(json) => json,
                None => read_input(None).await?,
            };
            let handler = MessageHandler::new(HostResolver::new(store));
            writeln!(out, "{}", handler.handle_json(&text).await)?;
        }
    }
    Ok(())
}

/// Parses `host[:port]` or a URL.
///
/// # Errors
///
/// Returns an error if the input is empty or an unparseable URL.
pub fn parse_origin(input: &str) -> AppResult<Origin> {
    let invalid = |reason: String| AppError::InvalidOrigin {
        input: input.to_string(),
        reason,
    };

    let origin = if input.contains("://") {
        Origin::from_url(input).map_err(|e| invalid(e.to_string()))?
    } else {
        Origin::parse(input)
    };

    if origin.hostname.is_empty() {
        return Err(invalid("missing hostname".to_string()));
    }
    Ok(origin)
}

/// Builds a draft for `set`, targeting the existing record with that key.
async fn draft_from(args: SetArgs, store: &VariableStore) -> AppResult<VariableDraft> {
    let existing = store.get_variable(&args.key).await?;
    let mut draft = VariableDraft::new(args.key, args.value)
        .with_hosts(args.hosts)
        .with_enabled(!args.disabled);
    if let Some(description) = args.description {
        draft = draft.with_description(description);
    }
    if let Some(existing) = existing {
        draft = draft.with_id(existing.id);
    }
    Ok(draft)
}

async fn read_input(path: Option<&Path>) -> AppResult<String> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AppError::File {
                path: path.to_path_buf(),
                source,
            }),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

async fn write_file(path: &Path, contents: &str) -> AppResult<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| AppError::File {
            path: path.to_path_buf(),
            source,
        })
}

fn write_table<W: Write>(out: &mut W, variables: &[Variable]) -> AppResult<()> {
    if variables.is_empty() {
        writeln!(out, "No variables")?;
        return Ok(());
    }

    let width = variables.iter().map(|v| v.key.len()).max().unwrap_or(0);
    for variable in variables {
        let scope = if variable.is_global() {
            "global".to_string()
        } else {
            variable.hosts.join(", ")
        };
        let flag = if variable.enabled { ' ' } else { '-' };
        writeln!(
            out,
            "{flag} {key:<width$}  {value}  [{scope}]",
            key = variable.key,
            value = variable.value,
        )?;
    }
    Ok(())
}

fn write_settings<W: Write>(out: &mut W, settings: &Settings) -> AppResult<()> {
    writeln!(out, "enabled:         {}", settings.enabled)?;
    writeln!(out, "case sensitive:  {}", settings.case_sensitive)?;
    writeln!(out, "trigger:         {}", settings.replacement_trigger)?;
    writeln!(out, "shortcut:        {}", settings.shortcut_key)?;
    writeln!(out, "theme:           {}", settings.theme)?;
    Ok(())
}
