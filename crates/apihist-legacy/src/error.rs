use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("dump is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl ParseError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }

    /// One-based line number of a syntax error.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. } => Some(*line),
            ParseError::Encoding(_) => None,
        }
    }
}
