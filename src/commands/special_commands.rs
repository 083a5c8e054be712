//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` manage the session instead of being sent to the
//! assistant. Command words are case-insensitive; arguments such as session
//! ids are kept as typed.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command takes no argument but one was given
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Archive the current conversation and start a new session
    NewSession,

    /// Clear the current conversation
    Clear,

    /// List stored sessions, optionally filtered by a search query
    ListSessions(Option<String>),

    /// Reopen a stored session by id
    SwitchSession(String),

    /// Show backend status and the active session
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input to the assistant
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, `CommandError::MissingArgument` for `/switch` without an
/// id and `CommandError::UnsupportedArgument` when an argument is passed to a
/// command that takes none.
///
/// # Examples
///
/// ```
/// use mira::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/switch chat_01HX").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchSession("chat_01HX".to_string()));
///
/// let cmd = parse_special_command("What is a data warehouse?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head.to_lowercase(), rest.trim()),
        None => (trimmed.to_lowercase(), ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    let no_arg = |command: SpecialCommand| match &arg {
        Some(a) => Err(CommandError::UnsupportedArgument {
            command: head.clone(),
            arg: a.clone(),
        }),
        None => Ok(command),
    };

    match head.as_str() {
        "/new" => no_arg(SpecialCommand::NewSession),
        "/clear" => no_arg(SpecialCommand::Clear),
        "/status" => no_arg(SpecialCommand::ShowStatus),
        "/help" | "/?" => no_arg(SpecialCommand::Help),
        "/exit" | "/quit" => no_arg(SpecialCommand::Exit),
        "/sessions" | "/history" => Ok(SpecialCommand::ListSessions(arg.clone())),
        "/switch" | "/load" => match arg.clone() {
            Some(id) => Ok(SpecialCommand::SwitchSession(id)),
            None => Err(CommandError::MissingArgument {
                command: head.clone(),
                usage: format!("{} <session_id>", head),
            }),
        },
        _ => Err(CommandError::UnknownCommand(head.clone())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

SESSIONS:
  /new               - Archive this conversation and start a new one
  /clear             - Clear this conversation
  /sessions [query]  - List stored sessions, optionally filtered
  /history [query]   - Same as /sessions
  /switch <id>       - Reopen a stored session
  /load <id>         - Same as /switch

INFORMATION:
  /status            - Show backend status and the active session
  /help              - Show this help message
  /?                 - Same as /help

SESSION CONTROL:
  /exit              - Exit interactive mode
  /quit              - Same as /exit

NOTES:
  - Command words are case-insensitive, session ids are not
  - Regular text (not starting with /) is sent to the assistant
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regular_text_returns_none() {
        assert_eq!(
            parse_special_command("What is a data warehouse?").unwrap(),
            SpecialCommand::None
        );
    }

    #[test]
    fn test_parse_empty_string_returns_none() {
        assert_eq!(parse_special_command("   ").unwrap(), SpecialCommand::None);
    }

    #[test]
    fn test_parse_new_and_clear() {
        assert_eq!(
            parse_special_command("/new").unwrap(),
            SpecialCommand::NewSession
        );
        assert_eq!(parse_special_command("/clear").unwrap(), SpecialCommand::Clear);
    }

    #[test]
    fn test_parse_sessions_with_and_without_query() {
        assert_eq!(
            parse_special_command("/sessions").unwrap(),
            SpecialCommand::ListSessions(None)
        );
        assert_eq!(
            parse_special_command("/history data warehouse").unwrap(),
            SpecialCommand::ListSessions(Some("data warehouse".to_string()))
        );
    }

    #[test]
    fn test_parse_switch_keeps_id_case() {
        assert_eq!(
            parse_special_command("/SWITCH chat_01HXABC").unwrap(),
            SpecialCommand::SwitchSession("chat_01HXABC".to_string())
        );
        assert_eq!(
            parse_special_command("/load default").unwrap(),
            SpecialCommand::SwitchSession("default".to_string())
        );
    }

    #[test]
    fn test_parse_switch_without_id_returns_error() {
        let err = parse_special_command("/switch").unwrap_err();
        assert_eq!(
            err,
            CommandError::MissingArgument {
                command: "/switch".to_string(),
                usage: "/switch <session_id>".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_argument_to_plain_command_returns_error() {
        let err = parse_special_command("/clear everything").unwrap_err();
        assert!(matches!(err, CommandError::UnsupportedArgument { .. }));
        assert!(err.to_string().contains("everything"));
    }

    #[test]
    fn test_parse_help_and_status() {
        assert_eq!(parse_special_command("/help").unwrap(), SpecialCommand::Help);
        assert_eq!(parse_special_command("/?").unwrap(), SpecialCommand::Help);
        assert_eq!(
            parse_special_command("/Status").unwrap(),
            SpecialCommand::ShowStatus
        );
    }

    #[test]
    fn test_parse_exit_variants() {
        for input in ["/exit", "/quit", "/EXIT", "  /quit  "] {
            assert_eq!(
                parse_special_command(input).unwrap(),
                SpecialCommand::Exit,
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_bare_exit_words_are_questions() {
        for input in ["exit", "QUIT", "  exit  "] {
            assert_eq!(
                parse_special_command(input).unwrap(),
                SpecialCommand::None,
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_unknown_command_returns_error() {
        let err = parse_special_command("/mode write").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/mode".to_string()));
        assert!(err.to_string().contains("/help"));
    }
}
