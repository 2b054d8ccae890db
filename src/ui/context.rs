//! UI context for detecting terminal output

use std::io::IsTerminal;

/// Whether status lines should be colored
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    colored: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let colored = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { colored }
    }

    /// A context that never colors, for tests and piped output
    pub fn plain() -> Self {
        Self { colored: false }
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }
}
