//! Meta-command parsing and dispatch for the chat application.
//!
//! A line starting with `:` controls the session instead of being sent to
//! the service.  Commands are matched exactly, after trimming surrounding
//! whitespace.

use crate::chat::session::ChatSession;
use crate::render::Renderer;
use crate::transport::Transport;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Return the conversation to its seed turns.
    Reset,

    /// Exit the chat application.
    Quit,

    /// Display help information.
    Help,

    /// Display session statistics.
    Stats,

    /// Anything else after a `:`, verbatim.
    Unknown(String),
}

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing but whitespace.
    Empty,
    /// A `:`-prefixed meta-command.
    Command(ChatCommand),
    /// Text to send, trimmed.
    Message(String),
}

/// What the interactive loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading input.
    Continue,
    /// Leave the loop.
    Quit,
}

/// Classifies a line of user input.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match parse_command(line) {
        Some(command) => Input::Command(command),
        None => Input::Message(line.to_string()),
    }
}

/// Parses user input for meta-commands.
///
/// Returns `Some(ChatCommand)` if the input starts with `:`, or `None` if it
/// should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use griseo::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command(":q"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command(":QUIT"), Some(ChatCommand::Unknown("QUIT".to_string())));
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let name = input.trim().strip_prefix(':')?;
    let command = match name {
        "r" | "reset" | "c" | "clear" => ChatCommand::Reset,
        "q" | "quit" => ChatCommand::Quit,
        "h" | "help" => ChatCommand::Help,
        "s" | "stats" => ChatCommand::Stats,
        _ => ChatCommand::Unknown(name.to_string()),
    };
    Some(command)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#":c, :clear            reset chat context
:h, :help             show this help message
:s, :stats            show session statistics
:q, :quit             exit the conversation"#
}

/// Applies `command` to `session`.
pub fn dispatch<T: Transport>(
    command: ChatCommand,
    session: &mut ChatSession<T>,
    renderer: &mut dyn Renderer,
) -> Outcome {
    match command {
        ChatCommand::Reset => {
            session.restart();
            renderer.print_info("Conversation reset.");
        }
        ChatCommand::Quit => return Outcome::Quit,
        ChatCommand::Help => renderer.print_info(help_text()),
        ChatCommand::Stats => {
            let stats = session.stats();
            let last = stats
                .last_attempts
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            renderer.print_info(&format!(
                "model: {}\nturns: {}\nexchanges: {}\nattempts (last/total): {}/{}",
                stats.model, stats.turn_count, stats.completed_exchanges, last, stats.total_attempts
            ));
        }
        ChatCommand::Unknown(name) => {
            tracing::warn!("unknown command :{name}");
            renderer.print_info(help_text());
        }
    }
    Outcome::Continue
}
