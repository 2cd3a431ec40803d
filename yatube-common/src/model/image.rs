use ::image::ImageFormat;
use base64::{DecodeError, Engine, prelude::BASE64_STANDARD};
use thiserror::Error;

pub const MAX_IMAGE_SIZE: usize = 2 * 1024 * 1024;

/// Formats a post image may have. Anything a browser could execute, like SVG, is left out.
const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// An uploaded post image, already decoded and size-checked.
///
/// `content_type` is derived from the bytes themselves, never taken from the client.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Image {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum InvalidImageError {
    #[error(
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
    )]
    NotAnImage,
    #[error("Upload a valid image. The payload is not valid base64: {0}")]
    Decode(#[from] DecodeError),
    #[error("Image size cannot exceed 2MB")]
    TooLarge(usize),
}

impl Image {
    /// Decodes either a bare base64 payload or a `data:image/<type>;base64,<payload>` URI.
    ///
    /// The MIME type of a data URI only has to name some image; the stored type is sniffed.
    pub fn from_base64(encoded: &str) -> Result<Self, InvalidImageError> {
        let payload = match encoded.strip_prefix("data:") {
            Some(data_uri) => {
                let (header, payload) = data_uri
                    .split_once(',')
                    .ok_or(InvalidImageError::NotAnImage)?;
                header
                    .strip_suffix(";base64")
                    .filter(|mime| mime.starts_with("image/"))
                    .ok_or(InvalidImageError::NotAnImage)?;
                payload
            }
            None => encoded,
        };

        let bytes = BASE64_STANDARD.decode(payload.trim())?;
        Self::new(bytes)
    }

    pub fn new(bytes: Vec<u8>) -> Result<Self, InvalidImageError> {
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(InvalidImageError::TooLarge(bytes.len()));
        }

        let format = ::image::guess_format(&bytes)
            .ok()
            .filter(|format| ACCEPTED_FORMATS.contains(format))
            .ok_or(InvalidImageError::NotAnImage)?;

        Ok(Self {
            content_type: format.to_mime_type().to_owned(),
            bytes,
        })
    }
}
