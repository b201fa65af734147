//! Terminal rendering of the conversation
//!
//! Turns are printed with a colored role tag followed by their content.

use crate::agent::{AgentFault, AgentFaultKind};
use crate::conversation::{ChatTurn, Conversation, Role};
use colored::Colorize;

/// Render one turn
///
/// # Examples
///
/// ```
/// use tabletalk::conversation::ChatTurn;
/// use tabletalk::transcript::render_turn;
///
/// let rendered = render_turn(&ChatTurn::user("How many rows?"));
/// assert!(rendered.contains("How many rows?"));
/// ```
pub fn render_turn(turn: &ChatTurn) -> String {
    let tag = match turn.role() {
        Role::User => "[you]".cyan().bold(),
        Role::Assistant => "[assistant]".green().bold(),
    };
    format!("{} {}", tag, turn.content())
}

/// Render every turn in order, separated by blank lines
pub fn render_transcript(conversation: &Conversation) -> String {
    conversation
        .all()
        .iter()
        .map(render_turn)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a failed turn in place of an answer
pub fn render_fault(fault: &AgentFault) -> String {
    let hint = match fault.kind {
        AgentFaultKind::Authentication | AgentFaultKind::MissingCredential => {
            " Set a valid key with /key <api key>."
        }
        AgentFaultKind::RateLimited => " Wait a moment and ask again.",
        _ => " You can ask again.",
    };
    format!("{} {}.{}", "[error]".red().bold(), fault, hint)
}

/// Render guidance shown instead of an answer
pub fn render_notice(message: &str) -> String {
    format!("{} {}", "[notice]".yellow().bold(), message)
}
