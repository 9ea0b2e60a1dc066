//! Run command handler

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use humansize::{format_size, DECIMAL};
use tracing::{info, warn};

use regen::declarations::Declarations;
use regen::output::{OutputSink, ReviewOutput};
use regen::pipeline::{
    Adjudicator, AutoAdjudicator, EndDecision, Regenerator, RunOptions, RunStats,
};
use regen::rules::{RuleStore, WILDCARD};
use regen::snapshots::FsSnapshotRepository;
use regen::theme::current_theme;
use regen::versions::FsVersionRepository;
use regen::Config;

use super::review::PromptAdjudicator;

/// Regenerate versions for the documents selected by `options`.
#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config, mut options: RunOptions) -> Result<()> {
    let theme = current_theme();
    let paths = &config.paths;

    options.snapshot_repository_url = config.run.snapshot_repository_url.clone();
    options.progress_log_interval = config.run.progress_log_interval;

    if options.interactive && !atty::is(atty::Stream::Stdin) {
        warn!("Standard input is not a terminal, running non interactively");
        options.interactive = false;
    }

    let rules_path = paths.rules_path();
    let mut rules = RuleStore::open(&rules_path)
        .with_context(|| format!("Failed to open rules file {}", rules_path.display()))?;
    let only = (!options.service_id.contains(WILDCARD)).then_some(options.service_id.as_str());
    let mut declarations = Declarations::load(&paths.declarations, only)
        .with_context(|| format!("Failed to load declarations from {}", paths.declarations.display()))?;
    let snapshots = FsSnapshotRepository::open(&paths.snapshots)
        .with_context(|| format!("Failed to open snapshots at {}", paths.snapshots.display()))?;
    let mut versions = FsVersionRepository::open(&paths.versions)
        .with_context(|| format!("Failed to open versions at {}", paths.versions.display()))?;
    let mut output = ReviewOutput::new(&paths.output)?;
    output.init_folders(&declarations.document_types())?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    if options.interactive && !options.restart {
        if let Some(progress) = rules.progress().cloned() {
            let mut prompt = PromptAdjudicator::stdio(theme.clone());
            if !prompt.confirm_resume(&progress)? {
                options.restart = true;
            }
        }
    }

    loop {
        let adjudicator: Box<dyn Adjudicator> = if options.interactive {
            Box::new(PromptAdjudicator::stdio(theme.clone()))
        } else {
            Box::new(AutoAdjudicator::echo(theme.clone()))
        };

        let mut regenerator = Regenerator::new(
            &mut rules,
            &mut declarations,
            &snapshots,
            &mut versions,
            &mut output,
        )
        .with_adjudicator(adjudicator)
        .with_stop_flag(Arc::clone(&stop));

        let stats = regenerator.run(&options)?;
        let end = regenerator.conclude(&options)?;
        drop(regenerator);

        report(&stats, &output);

        match end {
            Some(EndDecision::MarkAsDone) => {
                warn!("Don't forget to commit the changes in the declarations repository");
                info!("git add \"{}*\"", paths.declarations.join(&options.service_id).display());
                info!("git add \"{}\"", rules_path.display());
                info!(
                    "git commit -m \"Clean {} {}\"",
                    options.service_id, options.document_type
                );
                break;
            }
            Some(EndDecision::RestartNonInteractive) => {
                options.interactive = false;
                options.restart = true;
            }
            Some(EndDecision::Quit) | None => break,
        }
    }

    Ok(())
}

fn report(stats: &RunStats, output: &ReviewOutput) {
    if stats.interrupted {
        warn!("Run interrupted, start it again to resume");
    }
    let written = output.bytes_written();
    if written > 0 {
        info!(
            "{} of review copies written under {}",
            format_size(written, DECIMAL),
            output.root().display()
        );
    }
}
