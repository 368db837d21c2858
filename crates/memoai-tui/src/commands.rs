//! Slash command parsing.
//!
//! Anything not starting with `/` is a chat message. A leading `//` escapes
//! the slash, so `//stop` sends the text `/stop`.

/// Help text listing the commands.
pub const HELP: &str =
    "/stop  /clear  /reconnect  /auto on|off  /dark  /quit  (Esc stops or quits)";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send this text to the assistant.
    Message {
        /// Text as typed.
        content: String,
    },
    /// Stop the current answer.
    Stop,
    /// Clear the chat log.
    Clear,
    /// Drop the connection and connect again.
    Reconnect,
    /// Enable or pause automatic reconnection.
    AutoReconnect(bool),
    /// Toggle dark mode.
    DarkMode,
    /// Show the command list.
    Help,
    /// Leave the application.
    Quit,
    /// Not a known command.
    Unknown {
        /// The command as typed.
        input: String,
    },
    /// A known command with bad arguments.
    InvalidArgs {
        /// Command name.
        command: &'static str,
        /// What is wrong.
        error: String,
    },
}

/// Parse an input line.
pub fn parse(input: &str) -> Command {
    let Some(rest) = input.strip_prefix('/') else {
        return Command::Message { content: input.to_string() };
    };
    if rest.starts_with('/') {
        return Command::Message { content: rest.to_string() };
    }

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let no_args = |command: Command, name: &'static str| {
        if args.is_empty() {
            command
        } else {
            Command::InvalidArgs { command: name, error: "takes no arguments".to_string() }
        }
    };

    match name {
        "stop" => no_args(Command::Stop, "stop"),
        "clear" => no_args(Command::Clear, "clear"),
        "reconnect" => no_args(Command::Reconnect, "reconnect"),
        "dark" => no_args(Command::DarkMode, "dark"),
        "help" => no_args(Command::Help, "help"),
        "quit" | "q" => no_args(Command::Quit, "quit"),
        "auto" => match args.as_slice() {
            ["on"] => Command::AutoReconnect(true),
            ["off"] => Command::AutoReconnect(false),
            _ => Command::InvalidArgs { command: "auto", error: "expected on or off".to_string() },
        },
        _ => Command::Unknown { input: input.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse("Привет!"), Command::Message { content: "Привет!".into() });
        assert_eq!(parse(""), Command::Message { content: String::new() });
    }

    #[test]
    fn double_slash_escapes() {
        assert_eq!(parse("//stop"), Command::Message { content: "/stop".into() });
    }

    #[test]
    fn known_commands() {
        assert_eq!(parse("/stop"), Command::Stop);
        assert_eq!(parse("/clear"), Command::Clear);
        assert_eq!(parse("/reconnect"), Command::Reconnect);
        assert_eq!(parse("/dark"), Command::DarkMode);
        assert_eq!(parse("/q"), Command::Quit);
        assert_eq!(parse("/auto  off"), Command::AutoReconnect(false));
    }

    #[test]
    fn bad_arguments() {
        insta::assert_debug_snapshot!(parse("/auto maybe"), @r#"
        InvalidArgs {
            command: "auto",
            error: "expected on or off",
        }
        "#);
        insta::assert_debug_snapshot!(parse("/clear all"), @r#"
        InvalidArgs {
            command: "clear",
            error: "takes no arguments",
        }
        "#);
    }

    #[test]
    fn unknown_command() {
        assert_eq!(parse("/model q4"), Command::Unknown { input: "/model q4".into() });
        assert_eq!(parse("/"), Command::Unknown { input: "/".into() });
    }
}
