/// Command detection: classify inbound chat messages.
use crate::types::{BuiltinCommand, CommandInvocation};

/// Detect a command at the start of a message.
///
/// Only the first whitespace-delimited word counts. Returns `None` for
/// ordinary chatter and for a bare marker.
pub fn detect_command(text: &str, marker: char) -> Option<CommandInvocation> {
    let trimmed = text.trim();
    let (word, rest) = trimmed
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((trimmed, ""));

    let name = word.strip_prefix(marker)?;
    if name.is_empty() {
        return None;
    }

    match BuiltinCommand::from_name(name) {
        Some(command) => Some(CommandInvocation::Builtin {
            command,
            raw_args: rest.to_string(),
        }),
        None => Some(CommandInvocation::Sound {
            token: word.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chatter_is_ignored() {
        assert_eq!(detect_command("hello there", '!'), None);
        assert_eq!(detect_command("", '!'), None);
        assert_eq!(detect_command("!", '!'), None);
        assert_eq!(detect_command("say !airhorn", '!'), None);
    }

    #[test]
    fn builtins_are_recognized_case_insensitively() {
        assert_eq!(
            detect_command("!HELP", '!'),
            Some(CommandInvocation::Builtin {
                command: BuiltinCommand::Help,
                raw_args: String::new(),
            })
        );
        assert_eq!(
            detect_command("  !newsound please  ", '!'),
            Some(CommandInvocation::Builtin {
                command: BuiltinCommand::NewSound,
                raw_args: "please".to_string(),
            })
        );
    }

    #[test]
    fn builtin_must_be_the_whole_word() {
        assert_eq!(
            detect_command("!helpme", '!'),
            Some(CommandInvocation::Sound {
                token: "!helpme".to_string()
            })
        );
    }

    #[test]
    fn other_words_are_sound_requests() {
        let inv = detect_command("!airhorn loud", '!').unwrap();
        assert_eq!(inv.key(), "play");
        assert_eq!(
            inv,
            CommandInvocation::Sound {
                token: "!airhorn".to_string()
            }
        );
    }

    #[test]
    fn custom_marker() {
        assert!(detect_command("!airhorn", '$').is_none());
        assert_eq!(detect_command("$help", '$').unwrap().key(), "help");
    }
}
