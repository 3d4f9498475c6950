//! Log level selection and subscriber setup
//!
//! Diagnostics go to stderr so report output on stdout stays clean. The
//! `-v` count picks the level for this workspace's crates; `RUST_LOG`
//! overrides it entirely.

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Verbosity level for CLI diagnostics
///
/// Levels are ordered: Normal < Verbose < Debug < Trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Warnings only (default)
    #[default]
    Normal = 0,
    /// Connection and search summaries
    Verbose = 1,
    /// Per-page details
    Debug = 2,
    /// Everything, including ldap3 internals
    Trace = 3,
}

impl LogLevel {
    /// Create a level from the number of `-v` flags.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Normal => "warn",
            Self::Verbose => "warn,fgpp_core=info,fgpp_connector_ldap=info,fgpp_cli=info",
            Self::Debug => "warn,fgpp_core=debug,fgpp_connector_ldap=debug,fgpp_cli=debug",
            Self::Trace => "trace",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Install the global tracing subscriber.
pub fn init(level: LogLevel, color: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive())),
        )
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .init();
}
