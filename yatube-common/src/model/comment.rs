use crate::{
    model::{
        Id,
        post::PostMarker,
        text::Text,
        user::{UserMarker, Username},
    },
    permission::Authored,
};
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub author: Username,
    #[serde(skip)]
    pub author_id: Id<UserMarker>,
    pub text: Text,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub post: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub text: Text,
}

impl Authored for Comment {
    fn author_id(&self) -> Id<UserMarker> {
        self.author_id
    }
}
