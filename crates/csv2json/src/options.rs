use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;

/// Field separator accepted for uploaded tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Pipe,
    Semicolon,
    Tilde,
}

impl Delimiter {
    /// Maps a separator token to a delimiter. Unknown tokens, including the
    /// empty string, fall back to [`Delimiter::Comma`].
    pub fn resolve(token: &str) -> Self {
        match token {
            "," => Delimiter::Comma,
            "|" => Delimiter::Pipe,
            ";" => Delimiter::Semicolon,
            "~" => Delimiter::Tilde,
            _ => Delimiter::Comma,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Pipe => b'|',
            Delimiter::Semicolon => b';',
            Delimiter::Tilde => b'~',
        }
    }

    pub fn as_char(self) -> char {
        self.as_byte() as char
    }
}

impl FromStr for Delimiter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Delimiter::resolve(s))
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub delimiter: Delimiter,
    /// Pretty-print the produced JSON document
    pub pretty: bool,
}

impl Options {
    pub fn with_separator(token: &str) -> Self {
        Self {
            delimiter: Delimiter::resolve(token),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_tokens() {
        assert_eq!(Delimiter::resolve(","), Delimiter::Comma);
        assert_eq!(Delimiter::resolve("|"), Delimiter::Pipe);
        assert_eq!(Delimiter::resolve(";"), Delimiter::Semicolon);
        assert_eq!(Delimiter::resolve("~"), Delimiter::Tilde);
    }

    #[test]
    fn unknown_tokens_fall_back_to_comma() {
        assert_eq!(Delimiter::resolve(""), Delimiter::Comma);
        assert_eq!(Delimiter::resolve("\t"), Delimiter::Comma);
        assert_eq!(Delimiter::resolve(";;"), Delimiter::Comma);
        assert_eq!(Delimiter::resolve("semicolon"), Delimiter::Comma);
    }

    #[test]
    fn bytes_and_display() {
        assert_eq!(Delimiter::Tilde.as_byte(), b'~');
        assert_eq!(Delimiter::Pipe.to_string(), "|");
        assert_eq!("~".parse::<Delimiter>(), Ok(Delimiter::Tilde));
    }
}
