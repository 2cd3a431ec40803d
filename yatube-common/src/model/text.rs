use serde::Serialize;
use thiserror::Error;

/// Body text of a post or comment. Never empty or whitespace-only, and free of NUL characters,
/// which PostgreSQL refuses to store.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Text(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidTextError {
    #[error("Text cannot be empty")]
    Empty,
    #[error("Null characters are not allowed.")]
    NullCharacter,
}

impl Text {
    pub fn new(text: String) -> Result<Self, InvalidTextError> {
        if text.contains('\0') {
            Err(InvalidTextError::NullCharacter)
        } else if text.trim().is_empty() {
            Err(InvalidTextError::Empty)
        } else {
            Ok(Self(text))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Text {
    type Error = InvalidTextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
