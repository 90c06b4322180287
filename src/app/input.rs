// ABOUTME: Maps raw terminal lines typed in a chat room to chat actions

/// One line of user input inside a chat room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Text(String),
    Images(Vec<String>),
    Refresh,
    Quit,
    Empty,
    Unknown(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ChatInput::Text(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("quit") | Some("q") => ChatInput::Quit,
            Some("refresh") => ChatInput::Refresh,
            Some("image") => {
                let paths: Vec<String> = parts.map(str::to_string).collect();
                if paths.is_empty() {
                    ChatInput::Unknown(line.to_string())
                } else {
                    ChatInput::Images(paths)
                }
            }
            _ => ChatInput::Unknown(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_text() {
        assert_eq!(ChatInput::parse("  Selamat pagi  "), ChatInput::Text("Selamat pagi".to_string()));
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
    }

    #[test]
    fn test_commands() {
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/refresh"), ChatInput::Refresh);
        assert_eq!(
            ChatInput::parse("/image a.jpg /tmp/b.png"),
            ChatInput::Images(vec!["a.jpg".to_string(), "/tmp/b.png".to_string()])
        );
        assert!(matches!(ChatInput::parse("/image"), ChatInput::Unknown(_)));
        assert!(matches!(ChatInput::parse("/dance"), ChatInput::Unknown(_)));
    }
}
