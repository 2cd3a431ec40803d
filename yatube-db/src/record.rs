use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use yatube_common::model::{
    ModelValidationError,
    auth::Authentication,
    comment::Comment,
    follow::Follow,
    group::Group,
    image::Image,
    post::Post,
    text::Text,
    user::{User, Username},
};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct GroupRecord {
    pub group_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post joined with its author. The image itself is left out, only whether there is one.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub has_image: bool,
    pub group_id: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostImageRecord {
    pub image: Vec<u8>,
    pub image_content_type: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub created: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FollowRecord {
    pub username: String,
    pub following_username: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.into(),
            username: Username::new(value.username)?,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_id.into(),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl From<GroupRecord> for Group {
    fn from(value: GroupRecord) -> Self {
        Self {
            id: value.group_id.into(),
            title: value.title,
            slug: value.slug,
            description: value.description,
        }
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        let id = value.post_id.into();

        Ok(Self {
            id,
            author: Username::new(value.username)?,
            author_id: value.user_id.into(),
            text: Text::new(value.text)?,
            pub_date: value.pub_date,
            image: value.has_image.then(|| Post::image_url(id)),
            group: value.group_id.map(Into::into),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_id.into(),
            author: Username::new(value.username)?,
            author_id: value.user_id.into(),
            text: Text::new(value.text)?,
            created: value.created,
            post: value.post_id.into(),
        })
    }
}

impl TryFrom<FollowRecord> for Follow {
    type Error = ModelValidationError;

    fn try_from(value: FollowRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Username::new(value.username)?,
            following: Username::new(value.following_username)?,
        })
    }
}

impl From<PostImageRecord> for Image {
    fn from(value: PostImageRecord) -> Self {
        Self {
            content_type: value.image_content_type,
            bytes: value.image,
        }
    }
}
