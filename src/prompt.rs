//! Yes/no confirmations.
use std::io::{self, BufRead as _, IsTerminal as _, Write as _};

/// Asks the user to confirm an action.
pub trait Prompt: Send + Sync {
    /// Ask `question`; `default` is the answer for empty input and for
    /// sessions that cannot prompt.
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Prompts on the terminal.
///
/// Every question is answered "yes" when `assume_yes` is set, and with its
/// default when stdin is not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    assume_yes: bool,
}

impl TerminalPrompt {
    /// Create a prompt; `assume_yes` mirrors `DEVSETUP_YES`.
    #[must_use]
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        if self.assume_yes {
            return true;
        }
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return default;
        }
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!("{question} {hint} ");
        if io::stdout().flush().is_err() {
            return default;
        }
        let mut input = String::new();
        if stdin.lock().read_line(&mut input).is_err() {
            return default;
        }
        parse_answer(&input).unwrap_or(default)
    }
}

/// A prompt with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

impl Prompt for FixedPrompt {
    fn confirm(&self, _question: &str, _default: bool) -> bool {
        self.0
    }
}

/// `Some(true)` for yes, `Some(false)` for no, `None` for empty or
/// unrecognised input.
fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
