//! Config subcommands handler

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;

use regen::theme::current_theme;
use regen::Config;

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(config_path: &Path) -> Result<()> {
    let config = Config::load_from(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    let theme = current_theme();
    println!(
        "{}",
        theme.secondary_text(&format!("# {}", config_path.display()))
    );
    println!("{}", theme.primary_text(&toml_str));
    println!(
        "{}",
        theme.secondary_text(&format!(
            "# rules file: {}",
            config.paths.rules_path().display()
        ))
    );
    Ok(())
}

/// Open the configuration file in the default editor.
///
/// Uses $EDITOR environment variable (defaults to 'vi').
#[cfg(not(tarpaulin_include))]
pub fn handle_edit(config_path: &Path) -> Result<()> {
    let theme = current_theme();

    if !config_path.exists() {
        Config::default().save_to(config_path)?;
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    println!(
        "{}",
        theme.primary_text(&format!(
            "Opening {} with {}",
            config_path.display(),
            editor
        ))
    );

    std::process::Command::new(&editor)
        .arg(config_path)
        .status()
        .map_err(|e| anyhow::anyhow!("Failed to open editor: {}", e))?;

    Ok(())
}

/// Write a configuration file holding the default values.
#[cfg(not(tarpaulin_include))]
pub fn handle_init(config_path: &Path, force: bool) -> Result<()> {
    let theme = current_theme();

    if config_path.exists()
        && !force
        && !prompt_confirmation(&format!("Overwrite {}?", config_path.display()))?
    {
        println!("{}", theme.primary_text("No changes made."));
        return Ok(());
    }

    Config::default().save_to(config_path)?;
    println!(
        "{}",
        theme.success_text(&format!("Config written to {}", config_path.display()))
    );
    Ok(())
}

/// Prompt user for yes/no confirmation.
///
/// Returns true if user confirms (y/yes), false otherwise.
/// If stdin is not a TTY (non-interactive), returns false.
fn prompt_confirmation(message: &str) -> Result<bool> {
    let theme = current_theme();

    if !atty::is(atty::Stream::Stdin) {
        println!(
            "{}",
            theme.secondary_text("Non-interactive mode: use --force to overwrite")
        );
        return Ok(false);
    }

    print!("{} [y/N] ", theme.primary_text(message));
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    let response = input.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
