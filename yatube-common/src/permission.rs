//! Author-or-read-only access.
//!
//! Reads are open, creating needs an authenticated caller, and changing or deleting a resource is
//! reserved to its author. Authentication itself is checked by the API layer, so the only rule
//! left to enforce here is authorship.

use crate::model::{Id, user::UserMarker};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("You do not have permission to perform this action.")]
pub struct NotAuthorError;

pub trait Authored {
    fn author_id(&self) -> Id<UserMarker>;

    fn ensure_author(&self, caller: Id<UserMarker>) -> Result<(), NotAuthorError> {
        if self.author_id() == caller {
            Ok(())
        } else {
            Err(NotAuthorError)
        }
    }
}
