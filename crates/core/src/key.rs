//! Business keys, key schemas, and version tags
//!
//! A [`BusinessKey`] names one logical resource (one user's progress through
//! one grant) as an ordered list of opaque string attributes. Which attributes
//! make up a key is a deployment decision captured by a [`KeySchema`]:
//!
//! - grant application: `businessId`, `userId`, `grantId`
//! - farm business: `sbi`, `grantCode`
//!
//! Keys are always built through a schema so attribute order is canonical and
//! equality is attribute-wise.
//!
//! A [`VersionTag`] discriminates snapshots stored under one key. It is never
//! interpreted as a number.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::limits::{Limits, TextError};

/// Field name carrying the document payload in write requests
pub const STATE_FIELD: &str = "state";

/// Default name of the version field
pub const DEFAULT_VERSION_FIELD: &str = "grantVersion";

/// One named attribute of a business key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyAttribute {
    /// Attribute name, e.g. `businessId`
    pub name: String,
    /// Opaque attribute value
    pub value: String,
}

/// Compound identifier of a stored resource, excluding its version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessKey {
    attributes: Vec<KeyAttribute>,
}

impl BusinessKey {
    /// All attributes in schema order
    pub fn attributes(&self) -> &[KeyAttribute] {
        &self.attributes
    }

    /// Look up an attribute value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Always false for keys built through a schema
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", attr.name, attr.value)?;
        }
        Ok(())
    }
}

/// Writer-supplied discriminator between snapshots of one business key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    /// Create a tag, validating it against default limits
    pub fn new(tag: impl Into<String>) -> StateResult<Self> {
        Self::with_limits(tag, &Limits::default())
    }

    /// Create a tag, validating it against the given limits
    pub fn with_limits(tag: impl Into<String>, limits: &Limits) -> StateResult<Self> {
        let tag = tag.into();
        limits
            .validate_tag(&tag)
            .map_err(|e| StateError::malformed(format!("version tag {}", e)))?;
        Ok(VersionTag(tag))
    }

    /// Tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which attributes form a business key, and what the version field is called
///
/// # Example
///
/// ```
/// use grantstate_core::KeySchema;
///
/// let schema = KeySchema::grant_application();
/// let key = schema.key(["b1", "u1", "adding-value"]).unwrap();
/// assert_eq!(key.get("grantId"), Some("adding-value"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    attributes: Vec<String>,
    version_field: String,
    limits: Limits,
}

impl KeySchema {
    /// Build a schema from attribute names and the version field name
    ///
    /// # Errors
    ///
    /// Rejects an empty or oversized attribute list, duplicate or blank
    /// names, and names that collide with the version or `state` fields.
    pub fn new<I, S>(attributes: I, version_field: impl Into<String>) -> StateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_limits(attributes, version_field, Limits::default())
    }

    /// Build a schema with custom limits
    pub fn with_limits<I, S>(
        attributes: I,
        version_field: impl Into<String>,
        limits: Limits,
    ) -> StateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        let version_field = version_field.into();

        if attributes.is_empty() {
            return Err(StateError::malformed("key schema needs at least one attribute"));
        }
        if attributes.len() > limits.max_key_attributes {
            return Err(StateError::malformed(format!(
                "key schema has {} attributes, maximum is {}",
                attributes.len(),
                limits.max_key_attributes
            )));
        }
        if version_field.trim().is_empty() {
            return Err(StateError::malformed("version field name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for name in &attributes {
            if name.trim().is_empty() {
                return Err(StateError::malformed("key attribute name cannot be empty"));
            }
            if name == &version_field || name == STATE_FIELD {
                return Err(StateError::malformed(format!(
                    "key attribute '{}' collides with a reserved field",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(StateError::malformed(format!(
                    "duplicate key attribute '{}'",
                    name
                )));
            }
        }

        Ok(KeySchema {
            attributes,
            version_field,
            limits,
        })
    }

    /// `businessId`, `userId`, `grantId` keyed by `grantVersion`
    pub fn grant_application() -> Self {
        KeySchema {
            attributes: vec![
                "businessId".to_string(),
                "userId".to_string(),
                "grantId".to_string(),
            ],
            version_field: DEFAULT_VERSION_FIELD.to_string(),
            limits: Limits::default(),
        }
    }

    /// `sbi`, `grantCode` keyed by `grantVersion`
    pub fn farm_business() -> Self {
        KeySchema {
            attributes: vec!["sbi".to_string(), "grantCode".to_string()],
            version_field: DEFAULT_VERSION_FIELD.to_string(),
            limits: Limits::default(),
        }
    }

    /// Attribute names in key order
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Name of the version field
    pub fn version_field(&self) -> &str {
        &self.version_field
    }

    /// Limits applied to attribute values and tags
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// True if `name` is one of the key attributes
    pub fn is_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }

    /// Build a key from values given positionally in schema order
    pub fn key<I, S>(&self, values: I) -> StateResult<BusinessKey>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.attributes.len() {
            return Err(StateError::malformed(format!(
                "expected {} key attributes, got {}",
                self.attributes.len(),
                values.len()
            )));
        }
        let mut iter = values.into_iter();
        self.key_from(|_| iter.next())
    }

    /// Build a key by looking up each attribute by name
    ///
    /// `lookup` is called once per attribute in schema order.
    pub fn key_from<F>(&self, lookup: F) -> StateResult<BusinessKey>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.build_key(lookup, |value| self.limits.validate_attribute(value))
    }

    /// Build a key for a read or delete
    ///
    /// Attributes must be present and non-empty. Length and NUL limits only
    /// guard writes: a key that breaks them was never stored and simply
    /// matches nothing.
    pub fn lookup_key_from<F>(&self, lookup: F) -> StateResult<BusinessKey>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.build_key(lookup, |value| {
            if value.is_empty() {
                Err(TextError::Empty)
            } else {
                Ok(())
            }
        })
    }

    fn build_key<F, C>(&self, mut lookup: F, check: C) -> StateResult<BusinessKey>
    where
        F: FnMut(&str) -> Option<String>,
        C: Fn(&str) -> Result<(), TextError>,
    {
        let mut attributes = Vec::with_capacity(self.attributes.len());
        for name in &self.attributes {
            let value = lookup(name).ok_or_else(|| {
                StateError::malformed(format!("missing required attribute '{}'", name))
            })?;
            check(&value)
                .map_err(|e| StateError::malformed(format!("attribute '{}' {}", name, e)))?;
            attributes.push(KeyAttribute {
                name: name.clone(),
                value,
            });
        }
        Ok(BusinessKey { attributes })
    }

    /// Build a version tag under this schema's limits
    pub fn tag(&self, tag: impl Into<String>) -> StateResult<VersionTag> {
        VersionTag::with_limits(tag, &self.limits)
    }
}

impl Default for KeySchema {
    fn default() -> Self {
        KeySchema::grant_application()
    }
}
