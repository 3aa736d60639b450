//! Logging initialization.
//!
//! Verbosity flags map onto a `tracing_subscriber` environment filter; a
//! `RUST_LOG` setting always wins so framework internals and dependencies
//! can be debugged without new flags. Log output goes to stderr (or the
//! `--log-file` target) so it never interleaves with formatter output on
//! stdout.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Logging-related global flags.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbosity: u8,
    pub quiet: bool,
    pub trace: bool,
    pub log_file: Option<PathBuf>,
}

/// Builds the filter for a verbosity level.
fn env_filter(options: &LogOptions) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    let level = if options.quiet {
        "error"
    } else if options.trace {
        "trace"
    } else {
        match options.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    EnvFilter::new(format!(
        "hostmux={level},hostmux_dispatch={level},hostmux_session={level},hostmux_format={level}"
    ))
}

/// Initializes the global subscriber. Safe to call more than once: later
/// calls (as in test runs) are no-ops.
pub fn init_logging(options: &LogOptions) -> std::io::Result<()> {
    let filter = env_filter(options);
    match &options.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_build_for_all_levels() {
        for verbosity in 0..4 {
            let _ = env_filter(&LogOptions {
                verbosity,
                ..Default::default()
            });
        }
        let _ = env_filter(&LogOptions {
            quiet: true,
            ..Default::default()
        });
        let _ = env_filter(&LogOptions {
            trace: true,
            ..Default::default()
        });
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let options = LogOptions::default();
        init_logging(&options).unwrap();
        init_logging(&options).unwrap();
    }

    #[test]
    fn test_log_file_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        init_logging(&LogOptions {
            log_file: Some(path.clone()),
            ..Default::default()
        })
        .unwrap();
        assert!(path.exists());
    }
}
