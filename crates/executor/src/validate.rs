//! Request validation
//!
//! The [`RequestGate`] turns raw request input into typed [`Command`]s. It is
//! the only place that knows the wire shape of a request; everything past
//! it works with [`BusinessKey`] and [`VersionTag`].
//!
//! ## Write bodies
//!
//! ```json
//! { "businessId": "..", "userId": "..", "grantId": "..",
//!   "grantVersion": "R1", "state": { ... } }
//! ```
//!
//! Every key attribute and the version field must be present as non-empty
//! strings, `state` must be an object, and no other top-level field is
//! accepted.
//!
//! ## Read/delete queries
//!
//! Every key attribute must be present exactly once and non-empty. Write-side
//! length and NUL limits are not applied: such a key was never stored, so it
//! resolves to `NotFound`. The version field may be supplied, even repeatedly,
//! but never selects a version. Any other parameter is rejected.

use std::collections::HashSet;

use grantstate_core::{BusinessKey, KeySchema, STATE_FIELD};
use serde_json::Value;

use crate::{Command, Error, Result};

/// Validates requests against a deployment's key schema
#[derive(Debug, Clone, Default)]
pub struct RequestGate {
    schema: KeySchema,
}

impl RequestGate {
    /// Gate for `schema`
    pub fn new(schema: KeySchema) -> Self {
        Self { schema }
    }

    /// Key schema in use
    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Validate a write body into a `StateUpsert`
    pub fn write_command(&self, body: Value) -> Result<Command> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::malformed(format!(
                    "request body must be a JSON object, got {}",
                    json_type(&other)
                )))
            }
        };

        if let Some(unknown) = fields.keys().find(|name| !self.is_write_field(name)) {
            return Err(Error::malformed(format!("unknown field '{}'", unknown)));
        }

        let mut values = Vec::with_capacity(self.schema.attributes().len());
        for name in self.schema.attributes() {
            values.push(required_string(&fields, name, "attribute")?);
        }
        let key = self.schema.key(values)?;

        let version_field = self.schema.version_field();
        let tag = self
            .schema
            .tag(required_string(&fields, version_field, "field")?)?;

        let state = match fields.remove(STATE_FIELD) {
            Some(Value::Object(state)) => state,
            Some(other) => {
                return Err(Error::malformed(format!(
                    "field '{}' must be a JSON object, got {}",
                    STATE_FIELD,
                    json_type(&other)
                )))
            }
            None => {
                return Err(Error::malformed(format!(
                    "missing required field '{}'",
                    STATE_FIELD
                )))
            }
        };

        Ok(Command::StateUpsert { key, tag, state })
    }

    /// Validate query parameters into a business key
    pub fn query_key(&self, params: &[(String, String)]) -> Result<BusinessKey> {
        let mut seen = HashSet::with_capacity(params.len());
        for (name, _) in params {
            if !self.schema.is_attribute(name) {
                if name == self.schema.version_field() {
                    continue;
                }
                return Err(Error::malformed(format!(
                    "unknown query parameter '{}'",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::malformed(format!(
                    "query parameter '{}' given more than once",
                    name
                )));
            }
        }

        let key = self.schema.lookup_key_from(|attr| {
            params
                .iter()
                .find(|(name, _)| name == attr)
                .map(|(_, value)| value.clone())
        })?;
        Ok(key)
    }

    /// Validate query parameters into a `StateFetch`
    pub fn fetch_command(&self, params: &[(String, String)]) -> Result<Command> {
        Ok(Command::StateFetch {
            key: self.query_key(params)?,
        })
    }

    /// Validate query parameters into a `StateErase`
    pub fn erase_command(&self, params: &[(String, String)]) -> Result<Command> {
        Ok(Command::StateErase {
            key: self.query_key(params)?,
        })
    }

    fn is_write_field(&self, name: &str) -> bool {
        name == STATE_FIELD || name == self.schema.version_field() || self.schema.is_attribute(name)
    }
}

fn required_string(fields: &serde_json::Map<String, Value>, name: &str, what: &str) -> Result<String> {
    match fields.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::malformed(format!(
            "{} '{}' must be a string, got {}",
            what,
            name,
            json_type(other)
        ))),
        None => Err(Error::malformed(format!("missing required {} '{}'", what, name))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
