//! Rules subcommands handler

use anyhow::{Context, Result};

use regen::cli::RulesCommands;
use regen::rules::{RuleStore, RuleUpdate};
use regen::theme::current_theme;
use regen::Config;

#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config, command: RulesCommands) -> Result<()> {
    let theme = current_theme();
    let path = config.paths.rules_path();
    let mut rules = RuleStore::open(&path)
        .with_context(|| format!("Failed to open rules file {}", path.display()))?;

    let message = apply(&mut rules, command)?;
    if let Some(message) = message {
        println!("{}", theme.success_text(&message));
    }
    Ok(())
}

/// Apply one rule edit, returning what to tell the operator.
fn apply(rules: &mut RuleStore, command: RulesCommands) -> Result<Option<String>> {
    let (service, document_type, update) = match command {
        RulesCommands::Show => {
            println!("{}", serde_json::to_string_pretty(rules.rules())?);
            return Ok(None);
        }
        RulesCommands::Alias { raw, canonical } => {
            rules.add_document_type_alias(&raw, &canonical)?;
            return Ok(Some(format!("\"{}\" is now read as \"{}\"", raw, canonical)));
        }
        RulesCommands::Done {
            service,
            document_type,
        } => {
            rules.mark_as_done(&service, &document_type)?;
            return Ok(Some(format!(
                "{} - {} has been marked as done",
                service, document_type
            )));
        }
        RulesCommands::SkipSelector {
            service,
            document_type,
            selector,
        } => (service, document_type, RuleUpdate::SkipSelector(selector)),
        RulesCommands::SkipMissingSelector {
            service,
            document_type,
            selector,
        } => (
            service,
            document_type,
            RuleUpdate::SkipMissingSelector(selector),
        ),
        RulesCommands::SkipContent {
            service,
            document_type,
            selector,
            value,
        } => (
            service,
            document_type,
            RuleUpdate::SkipContent { selector, value },
        ),
        RulesCommands::SkipCommit {
            service,
            document_type,
            snapshot_id,
        } => (service, document_type, RuleUpdate::SkipCommit(snapshot_id)),
    };

    let field = update.field();
    rules.update_document(&service, &document_type, update)?;
    Ok(Some(format!(
        "Added {} rule to {} - {}",
        field, service, document_type
    )))
}
