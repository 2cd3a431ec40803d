//! Request bodies and the field validation turning them into model values.
//!
//! Every field is optional at the serde level so that a missing field is reported like any other
//! validation failure, naming the field.

use serde::Deserialize;
use std::fmt::Display;
use thiserror::Error;
use yatube_common::{
    model::{
        Id,
        follow::InvalidFollowError,
        group::GroupMarker,
        image::Image,
        post::{CreatePost, UpdatePost},
        text::Text,
        user::{UserMarker, Username},
    },
    util::deserialize_some,
};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("{message}")]
pub struct FieldError {
    /// `None` for errors about the request as a whole.
    pub field: Option<&'static str>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Display) -> Self {
        Self {
            field: Some(field),
            message: message.to_string(),
        }
    }

    pub fn non_field(message: impl Display) -> Self {
        Self {
            field: None,
            message: message.to_string(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        Self::new(field, "This field is required.")
    }

    pub fn null(field: &'static str) -> Self {
        Self::new(field, "This field may not be null.")
    }

    pub fn unknown_group(group: Id<GroupMarker>) -> Self {
        Self::new("group", format!("Invalid pk \"{group}\" - object does not exist."))
    }

    pub fn unknown_username(username: &str) -> Self {
        Self::new(
            "following",
            format!("Object with username={username} does not exist."),
        )
    }

    pub fn username_taken() -> Self {
        Self::new("username", "A user with that username already exists.")
    }
}

impl From<InvalidFollowError> for FieldError {
    fn from(value: InvalidFollowError) -> Self {
        Self::non_field(value)
    }
}

fn validate_text(text: String) -> Result<Text, FieldError> {
    Text::new(text).map_err(|err| FieldError::new("text", err))
}

/// `text` of a create or full update: it has to be there and must not be null.
fn required_text(text: Option<Option<String>>) -> Result<Text, FieldError> {
    match text {
        Some(Some(text)) => validate_text(text),
        Some(None) => Err(FieldError::null("text")),
        None => Err(FieldError::required("text")),
    }
}

/// `text` of a partial update: it may be left out, but not set to null.
fn optional_text(text: Option<Option<String>>) -> Result<Option<Text>, FieldError> {
    match text {
        Some(Some(text)) => validate_text(text).map(Some),
        Some(None) => Err(FieldError::null("text")),
        None => Ok(None),
    }
}

fn validate_image(image: &str) -> Result<Image, FieldError> {
    Image::from_base64(image).map_err(|err| FieldError::new("image", err))
}

/// Body of post create, replace and update requests.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub text: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub group: Option<Option<Id<GroupMarker>>>,
}

impl PostPayload {
    pub fn into_create(self, author: Id<UserMarker>) -> Result<CreatePost, FieldError> {
        let text = required_text(self.text)?;
        let image = self
            .image
            .flatten()
            .map(|image| validate_image(&image))
            .transpose()?;

        Ok(CreatePost {
            author,
            text,
            image,
            group: self.group.flatten(),
        })
    }

    /// A full update (`partial == false`) still requires `text`; image and group stay optional.
    pub fn into_update(self, partial: bool) -> Result<UpdatePost, FieldError> {
        let text = if partial {
            optional_text(self.text)?
        } else {
            Some(required_text(self.text)?)
        };
        let image = self
            .image
            .map(|image| image.map(|image| validate_image(&image)).transpose())
            .transpose()?;

        Ok(UpdatePost {
            text,
            image,
            group: self.group,
        })
    }
}

/// Body of comment requests. `author` and `post` are ignored if sent.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct CommentPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub text: Option<Option<String>>,
}

impl CommentPayload {
    pub fn into_text(self) -> Result<Text, FieldError> {
        required_text(self.text)
    }

    pub fn into_partial_text(self) -> Result<Option<Text>, FieldError> {
        optional_text(self.text)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct FollowPayload {
    pub following: Option<String>,
}

impl FollowPayload {
    /// A malformed username cannot belong to anyone, so it is reported as unknown.
    pub fn into_username(self) -> Result<Username, FieldError> {
        let following = self.following.ok_or(FieldError::required("following"))?;
        Username::new(following).map_err(|err| FieldError::unknown_username(err.rejected()))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
}

impl UserPayload {
    pub fn into_username(self) -> Result<Username, FieldError> {
        let username = self.username.ok_or(FieldError::required("username"))?;
        Username::new(username).map_err(|err| FieldError::new("username", err))
    }
}

#[cfg(test)]
mod tests {
    use crate::server::payload::{CommentPayload, FieldError, FollowPayload, PostPayload};
    use yatube_common::model::{Id, image::MAX_IMAGE_SIZE};

    fn post(json: &str) -> PostPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn create_requires_nonblank_text() {
        assert_eq!(
            post("{}").into_create(Id::new(1)),
            Err(FieldError::required("text"))
        );
        for blank in [r#"{"text": ""}"#, r#"{"text": "   "}"#, r#"{"text": "\n\t"}"#] {
            assert_eq!(
                post(blank).into_create(Id::new(1)),
                Err(FieldError::new("text", "Text cannot be empty")),
                "{blank}"
            );
        }
    }

    #[test]
    fn create_ignores_client_author() {
        let create = post(r#"{"text": "hello", "author": 99, "group": 4}"#)
            .into_create(Id::new(1))
            .unwrap();

        assert_eq!(create.author, Id::new(1));
        assert_eq!(create.text.get(), "hello");
        assert_eq!(create.group, Some(Id::new(4)));
        assert_eq!(create.image, None);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let payload = PostPayload {
            text: Some(Some("hello".to_owned())),
            image: Some(Some(base64_zeroes(MAX_IMAGE_SIZE + 1))),
            group: None,
        };

        let err = payload.into_create(Id::new(1)).unwrap_err();
        assert_eq!(err.field, Some("image"));
        assert_eq!(err.message, "Image size cannot exceed 2MB");
    }

    #[test]
    fn full_update_requires_text() {
        assert_eq!(
            post(r#"{"group": null}"#).into_update(false),
            Err(FieldError::required("text"))
        );

        let update = post(r#"{"group": null}"#).into_update(true).unwrap();
        assert_eq!(update.text, None);
        assert_eq!(update.group, Some(None));
        assert_eq!(update.image, None);
    }

    #[test]
    fn null_text_is_rejected() {
        let null = || post(r#"{"text": null}"#);
        assert_eq!(null().into_create(Id::new(1)), Err(FieldError::null("text")));
        assert_eq!(null().into_update(false), Err(FieldError::null("text")));
        assert_eq!(null().into_update(true), Err(FieldError::null("text")));

        let comment = || -> CommentPayload {
            serde_json::from_str(r#"{"text": null}"#).unwrap()
        };
        assert_eq!(comment().into_text(), Err(FieldError::null("text")));
        assert_eq!(comment().into_partial_text(), Err(FieldError::null("text")));
        assert_eq!(
            FieldError::null("text").message,
            "This field may not be null."
        );
    }

    #[test]
    fn null_characters_in_text() {
        let err = post(r#"{"text": "a\u0000b"}"#)
            .into_create(Id::new(1))
            .unwrap_err();
        assert_eq!(err, FieldError::new("text", "Null characters are not allowed."));

        let comment: CommentPayload = serde_json::from_str(r#"{"text": "\u0000"}"#).unwrap();
        assert_eq!(
            comment.into_partial_text(),
            Err(FieldError::new("text", "Null characters are not allowed."))
        );
    }

    #[test]
    fn svg_image_is_rejected() {
        let payload = post(
            r#"{"text": "hi", "image": "data:image/svg+xml;base64,PHN2ZyBvbmxvYWQ9ImFsZXJ0KDEpIi8+"}"#,
        );

        let err = payload.into_create(Id::new(1)).unwrap_err();
        assert_eq!(err.field, Some("image"));
        assert!(err.message.starts_with("Upload a valid image."));
    }

    #[test]
    fn null_image_clears_it() {
        let update = post(r#"{"image": null}"#).into_update(true).unwrap();
        assert_eq!(update.image, Some(None));
    }

    #[test]
    fn comment_text() {
        let blank: CommentPayload = serde_json::from_str(r#"{"text": " "}"#).unwrap();
        assert!(blank.into_text().is_err());

        let missing = CommentPayload::default();
        assert_eq!(missing.into_partial_text(), Ok(None));
    }

    #[test]
    fn follow_target() {
        let follow: FollowPayload = serde_json::from_str(r#"{"following": "alice"}"#).unwrap();
        assert_eq!(follow.into_username().unwrap().get(), "alice");

        let malformed: FollowPayload = serde_json::from_str(r#"{"following": "a b"}"#).unwrap();
        assert_eq!(
            malformed.into_username(),
            Err(FieldError::unknown_username("a b"))
        );
    }

    fn base64_zeroes(len: usize) -> String {
        // Every group of three zero bytes encodes to "AAAA".
        let mut encoded = "AAAA".repeat(len / 3);
        match len % 3 {
            1 => encoded.push_str("AA=="),
            2 => encoded.push_str("AAA="),
            _ => {}
        }
        encoded
    }
}
