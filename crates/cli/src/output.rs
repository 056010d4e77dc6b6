//! Terminal output settings

use std::io::IsTerminal;

use clap::ValueEnum;

/// Format for diagnostic logs on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines (default)
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Whether report markers should be colored
pub fn color_enabled(no_color: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}
