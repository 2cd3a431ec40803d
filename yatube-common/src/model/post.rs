use crate::{
    model::{
        Id,
        group::GroupMarker,
        image::Image,
        text::Text,
        user::{UserMarker, Username},
    },
    permission::Authored,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Username,
    #[serde(skip)]
    pub author_id: Id<UserMarker>,
    pub text: Text,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    /// URL the image is served under.
    pub image: Option<String>,
    pub group: Option<Id<GroupMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub text: Text,
    pub image: Option<Image>,
    pub group: Option<Id<GroupMarker>>,
}

/// Changes to apply to a post. `None` leaves a field untouched.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UpdatePost {
    pub text: Option<Text>,
    pub image: Option<Option<Image>>,
    pub group: Option<Option<Id<GroupMarker>>>,
}

/// Exact-match filters for post listings.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostFilter {
    pub group: Option<Id<GroupMarker>>,
    pub author: Option<Id<UserMarker>>,
}

impl Post {
    #[must_use]
    pub fn image_url(id: Id<PostMarker>) -> String {
        format!("/posts/{id}/image")
    }
}

impl Authored for Post {
    fn author_id(&self) -> Id<UserMarker> {
        self.author_id
    }
}
