//! Classifier label → text token.

/// Edit commands a classifier label can stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Space,
    Delete,
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Space => "space",
            Command::Delete => "delete",
        }
    }
}

/// What a stabilized label means for the text buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Single upper-case ASCII letter or digit.
    Letter(char),
    Command(Command),
    /// Any other label, typed verbatim by the phrase pipeline.
    Phrase(String),
}

/// Label used for frames without a prediction.
pub const BLANK_LABEL: &str = "none";

impl Token {
    /// Map a label.  Empty labels and the blank label yield `None`.
    ///
    /// ```
    /// use sign_to_text::commit::{Command, Token};
    ///
    /// assert_eq!(Token::from_label("a"), Some(Token::Letter('A')));
    /// assert_eq!(Token::from_label(" Space "), Some(Token::Command(Command::Space)));
    /// assert_eq!(Token::from_label("backspace"), Some(Token::Command(Command::Delete)));
    /// assert_eq!(Token::from_label("THANKS"), Some(Token::Phrase("THANKS".into())));
    /// assert_eq!(Token::from_label("none"), None);
    /// ```
    pub fn from_label(label: &str) -> Option<Token> {
        let t = label.trim();
        if t.is_empty() || t.eq_ignore_ascii_case(BLANK_LABEL) {
            return None;
        }

        let mut chars = t.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Some(Token::Letter(c.to_ascii_uppercase()));
            }
        }

        match t.to_ascii_uppercase().as_str() {
            "SPACE" => Some(Token::Command(Command::Space)),
            "DEL" | "DELETE" | "BACKSPACE" => Some(Token::Command(Command::Delete)),
            _ => Some(Token::Phrase(t.to_string())),
        }
    }

    pub fn command(&self) -> Option<Command> {
        match self {
            Token::Command(c) => Some(*c),
            _ => None,
        }
    }
}
