//! The global CLI surface.
//!
//! Global flags are parsed by clap; everything after them - the command
//! path and its options - is handed untouched to the command tree, whose
//! end-points parse it against their own usage grammars. The same argument
//! vector shape works for interactive-mode lines, which never pass through
//! clap at all.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use hostmux_format::ListerKind;

/// Structured-output selection for `--lister-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListerFormat {
    Table,
    Csv,
}

impl From<ListerFormat> for ListerKind {
    fn from(format: ListerFormat) -> Self {
        match format {
            ListerFormat::Table => ListerKind::Table,
            ListerFormat::Csv => ListerKind::Csv,
        }
    }
}

/// Global options, shared by every command.
///
/// The application name and version are attached by [`crate::App`] when it
/// assembles the clap command, which also gives clap's auto `--version`.
#[derive(Parser, Debug, Default)]
pub struct GlobalOpts {
    /// Target host (repeatable); [scheme://][user[:pass]@]host[:port]
    #[arg(long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// File with one host per line, optionally with embedded credentials
    #[arg(long, value_name = "PATH")]
    pub hosts_file: Option<PathBuf>,

    /// User name presented to every host (overrides hosts-file entries)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Reuse the first verified host's credentials for later hosts
    #[arg(long)]
    pub same_credentials: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub noverify: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log at trace level regardless of -v
    #[arg(long, overrides_with = "notrace")]
    pub trace: bool,

    /// Undo a --trace earlier on the command line
    #[arg(long)]
    pub notrace: bool,

    /// Log errors only
    #[arg(long)]
    pub quiet: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Protocol namespace handed to the connector
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Suppress table headers and host headings
    #[arg(long)]
    pub no_headings: bool,

    /// Prefer aligned table output even when piped
    #[arg(long)]
    pub human_friendly: bool,

    /// Force the output style for listing commands
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub lister_format: Option<ListerFormat>,

    /// The command to run; omit it to enter interactive mode
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GlobalOpts {
        GlobalOpts::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_hosts_repeatable() {
        let opts = parse(&["app", "--host", "a", "--host", "b"]);
        assert_eq!(opts.hosts, vec!["a", "b"]);
    }

    #[test]
    fn test_command_trailing_with_hyphens() {
        let opts = parse(&["app", "--host", "a", "volume", "list", "--long"]);
        assert_eq!(opts.command, vec!["volume", "list", "--long"]);
    }

    #[test]
    fn test_empty_command_means_interactive() {
        let opts = parse(&["app", "--host", "a"]);
        assert!(opts.command.is_empty());
    }

    #[test]
    fn test_verbosity_counts() {
        assert_eq!(parse(&["app", "-vvv"]).verbose, 3);
    }

    #[test]
    fn test_trace_notrace_overrides() {
        let opts = parse(&["app", "--trace", "--notrace"]);
        assert!(!opts.trace);
        assert!(opts.notrace);
    }

    #[test]
    fn test_lister_format_values() {
        assert_eq!(
            parse(&["app", "--lister-format", "csv"]).lister_format,
            Some(ListerFormat::Csv)
        );
        assert_eq!(
            parse(&["app", "--lister-format", "table"]).lister_format,
            Some(ListerFormat::Table)
        );
        assert!(GlobalOpts::try_parse_from(["app", "--lister-format", "xml"]).is_err());
    }

    #[test]
    fn test_kind_conversion() {
        assert_eq!(ListerKind::from(ListerFormat::Csv), ListerKind::Csv);
        assert_eq!(ListerKind::from(ListerFormat::Table), ListerKind::Table);
    }
}
