//! Log output setup.
//!
//! Log lines go to stderr so stdout stays free for diffs and listings.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count.
pub fn directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "regen=info",
        1 => "regen=debug",
        _ => "regen=trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `-v` when set.
///
/// Calling it twice is harmless: the second subscriber is dropped.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr) && std::env::var_os("NO_COLOR").is_none())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(directive(0), "regen=info");
        assert_eq!(directive(1), "regen=debug");
        assert_eq!(directive(5), "regen=trace");
    }
}
