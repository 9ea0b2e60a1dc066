//! Progress subcommands handler

use anyhow::Result;

use regen::rules::RuleStore;
use regen::theme::current_theme;
use regen::Config;

/// Print the stored checkpoint.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(config: &Config) -> Result<()> {
    let theme = current_theme();
    let rules = RuleStore::open(config.paths.rules_path())?;

    match rules.progress() {
        Some(progress) => {
            println!(
                "{}",
                theme.primary_text(&format!(
                    "Last snapshot: {}\nNext index:    {}\nSaved:         {}",
                    progress.snapshot_id, progress.index, progress.date
                ))
            );
            if !progress.pending.is_empty() {
                println!(
                    "{}",
                    theme.secondary_text(&format!(
                        "Buffered pages: {}",
                        progress.pending.join(", ")
                    ))
                );
            }
        }
        None => println!("{}", theme.secondary_text("No run in progress")),
    }
    Ok(())
}

/// Drop the stored checkpoint; the next run starts over.
#[cfg(not(tarpaulin_include))]
pub fn handle_reset(config: &Config) -> Result<()> {
    let theme = current_theme();
    let mut rules = RuleStore::open(config.paths.rules_path())?;
    rules.reset_progress()?;
    println!("{}", theme.success_text("Progress has been reset"));
    Ok(())
}
