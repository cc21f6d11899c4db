//! Terminal presentation helpers: styles, spinner, failure messages.
use console::{Style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

/// Generic fallback shown for any reply-path failure other than quota
/// exhaustion or caller cancellation. Details go to the log, not the user.
pub const FALLBACK_REPLY: &str = "The stars are quiet right now. Take a breath and ask again.";

pub const QUOTA_HINT: &str =
    "The oracle rests until tomorrow. Gold members ask without limit: `stardust gold buy`.";

pub const CANCELLED_FOOTER: &str = "◼ Cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Prompt,
    Oracle,
    Footer,
    Error,
}

pub fn style_text(text: &str, style: MessageType) -> StyledObject<&str> {
    let style_obj = match style {
        MessageType::Prompt => Style::new().blue().bold(),
        MessageType::Oracle => Style::new().magenta(),
        MessageType::Footer => Style::new().white().dim(),
        MessageType::Error => Style::new().red().bold(),
    };
    style_obj.apply_to(text)
}

pub fn present_error(err: &anyhow::Error) {
    eprintln!("{} {err:#}", style_text("Error:", MessageType::Error));
}

#[derive(Debug)]
pub struct GenerationSpinner {
    spinner: ProgressBar,
}

impl GenerationSpinner {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.set_message("Consulting the stars...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { spinner }
    }

    pub fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

/// Footer line after an answered question: remaining allowance, or the gold
/// marker for subscribers.
pub fn format_quota_footer(remaining: u32, limit: u32, subscribed: bool) -> String {
    if subscribed {
        "◼ Gold membership active.".to_string()
    } else {
        format!("◼ {remaining} of {limit} free questions left today.")
    }
}
