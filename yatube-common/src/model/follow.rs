use crate::model::{
    Id,
    user::{UserMarker, Username},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Follow {
    pub user: Username,
    pub following: Username,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidFollowError {
    #[error("You can't follow yourself")]
    SelfFollow,
    #[error("You are already following this user")]
    AlreadyFollowing,
}

/// Rejects a user following themselves.
pub fn check_not_self(
    user: Id<UserMarker>,
    following: Id<UserMarker>,
) -> Result<(), InvalidFollowError> {
    if user == following {
        Err(InvalidFollowError::SelfFollow)
    } else {
        Ok(())
    }
}

/// Splits a search string into terms. Every term has to match the followed username.
///
/// NUL characters are dropped before splitting; no username can contain one.
#[must_use]
pub fn search_terms(search: &str) -> Vec<String> {
    search
        .replace('\0', "")
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
