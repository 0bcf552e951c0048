//! Size limits and text validation for key attributes and version tags
//!
//! Attribute values and version tags are opaque strings, but they still obey
//! a few rules enforced before anything reaches the index:
//! - must not be empty
//! - must not contain NUL bytes (\0)
//! - must not exceed the configured length in bytes

use thiserror::Error;

/// Default maximum attribute value / version tag length in bytes
pub const MAX_ATTRIBUTE_LEN: usize = 256;

/// Default maximum number of attributes in a business key
pub const MAX_KEY_ATTRIBUTES: usize = 8;

/// Size limits for business keys and version tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum attribute value length in bytes (default: 256)
    pub max_attribute_bytes: usize,

    /// Maximum version tag length in bytes (default: 256)
    pub max_tag_bytes: usize,

    /// Maximum attributes per key schema (default: 8)
    pub max_key_attributes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_attribute_bytes: MAX_ATTRIBUTE_LEN,
            max_tag_bytes: MAX_ATTRIBUTE_LEN,
            max_key_attributes: MAX_KEY_ATTRIBUTES,
        }
    }
}

impl Limits {
    /// Validate an attribute value
    pub fn validate_attribute(&self, value: &str) -> Result<(), TextError> {
        validate_text(value, self.max_attribute_bytes)
    }

    /// Validate a version tag
    pub fn validate_tag(&self, tag: &str) -> Result<(), TextError> {
        validate_text(tag, self.max_tag_bytes)
    }
}

fn validate_text(text: &str, max: usize) -> Result<(), TextError> {
    if text.is_empty() {
        return Err(TextError::Empty);
    }
    if text.contains('\x00') {
        return Err(TextError::ContainsNul);
    }
    if text.len() > max {
        return Err(TextError::TooLong {
            actual: text.len(),
            max,
        });
    }
    Ok(())
}

/// Attribute / tag validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    /// Value is empty
    #[error("cannot be empty")]
    Empty,

    /// Value contains a NUL byte
    #[error("cannot contain NUL bytes")]
    ContainsNul,

    /// Value exceeds the maximum length
    #[error("too long: {actual} bytes exceeds maximum {max}")]
    TooLong {
        /// Actual length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },
}

impl TextError {
    /// Short machine-readable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            TextError::Empty => "empty",
            TextError::ContainsNul => "contains_nul",
            TextError::TooLong { .. } => "too_long",
        }
    }
}
