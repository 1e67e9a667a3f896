//! Photo data URIs (`data:image/<subtype>;base64,<payload>`)

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::GatewayError;

const EMPTY_MESSAGE: &str = "Photo data URI cannot be empty.";
const INVALID_MESSAGE: &str =
    "Photo must be a valid data URI for an image (e.g., data:image/jpeg;base64,...).";

/// A validated image data URI, split into media type and base64 payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDataUri {
    mime_type: String,
    data: String,
}

impl PhotoDataUri {
    /// Parse and validate; the payload must decode as standard base64
    pub fn parse(input: &str) -> Result<Self, GatewayError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GatewayError::InvalidInput(EMPTY_MESSAGE.to_string()));
        }

        let invalid = || GatewayError::InvalidInput(INVALID_MESSAGE.to_string());

        let rest = input.strip_prefix("data:").ok_or_else(invalid)?;
        if !rest.starts_with("image/") {
            return Err(invalid());
        }
        let (mime_type, data) = rest.split_once(";base64,").ok_or_else(invalid)?;
        if mime_type.len() <= "image/".len() || data.is_empty() {
            return Err(invalid());
        }
        STANDARD.decode(data).map_err(|_| invalid())?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    /// e.g. `image/jpeg`
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload, still encoded
    pub fn data(&self) -> &str {
        &self.data
    }
}
