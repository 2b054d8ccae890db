//! Terminal output helpers shared by the commands
//!
//! Status lines go to stdout with `console` styling. When stdout is not a
//! terminal the markers stay but colors are dropped, so the output can be
//! piped or asserted on in tests.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, step_info, step_ok, step_ok_detail, step_warn_hint};
