//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, StyledObject};

fn paint<D>(ctx: &UiContext, styled: StyledObject<D>) -> StyledObject<D> {
    styled.force_styling(ctx.is_colored())
}

/// Display a title line
pub fn intro(ctx: &UiContext, title: &str) {
    println!("{}", paint(ctx, style(title).cyan().bold()));
    println!();
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    println!("  {} {}", paint(ctx, style("[OK]").green()), message);
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {} ({})",
        paint(ctx, style("[OK]").green()),
        message,
        paint(ctx, style(detail).dim())
    );
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    println!(
        "  {} {} - {}",
        paint(ctx, style("[WARN]").yellow()),
        message,
        hint
    );
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    println!("  {} {}", paint(ctx, style("[INFO]").cyan()), message);
}

/// Print a styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    println!("  {}: {}", paint(ctx, style(key).dim()), value);
}
