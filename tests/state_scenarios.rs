//! End-to-end state scenarios through the public API
//!
//! Each scenario goes gate -> executor -> repository, the same path an HTTP
//! request takes, against both storage backends.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use grantstate::{
    Command, Error, Executor, KeySchema, Output, RequestGate, StateRepository, VersionTag,
};
use grantstate_storage::LOG_FILE_NAME;
use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    gate: RequestGate,
    executor: Executor,
    business: String,
    user: String,
}

impl Harness {
    fn over(repo: StateRepository) -> Self {
        Self {
            gate: RequestGate::new(KeySchema::grant_application()),
            executor: Executor::new(Arc::new(repo)),
            business: Uuid::new_v4().to_string(),
            user: Uuid::new_v4().to_string(),
        }
    }

    fn memory() -> Self {
        Self::over(StateRepository::ephemeral())
    }

    fn write(&self, version: &str, state: Value) -> Result<Output, Error> {
        let cmd = self.gate.write_command(json!({
            "businessId": self.business,
            "userId": self.user,
            "grantId": "adding-value",
            "grantVersion": version,
            "state": state
        }))?;
        self.executor.execute(cmd)
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            ("businessId".into(), self.business.clone()),
            ("userId".into(), self.user.clone()),
            ("grantId".into(), "adding-value".into()),
        ]
    }

    fn read(&self) -> Result<Value, Error> {
        match self.executor.execute(self.gate.fetch_command(&self.params())?)? {
            Output::Document(doc) => Ok(Value::Object(doc)),
            other => panic!("unexpected {:?}", other),
        }
    }

    fn erase(&self) -> Result<VersionTag, Error> {
        match self.executor.execute(self.gate.erase_command(&self.params())?)? {
            Output::Erased { tag } => Ok(tag),
            other => panic!("unexpected {:?}", other),
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_create_then_update_same_version() {
    let h = Harness::memory();
    assert_eq!(h.write("1", json!({"a": 1})).unwrap(), Output::Upserted { created: true });
    assert_eq!(h.write("1", json!({"a": 2})).unwrap(), Output::Upserted { created: false });
    assert_eq!(h.read().unwrap(), json!({"a": 2}));
}

#[test]
fn test_three_versions_then_erase() {
    let h = Harness::memory();
    h.write("1", json!({"grantVersion": "R1"})).unwrap();
    h.write("2", json!({"grantVersion": "R2"})).unwrap();
    h.write("3", json!({"grantVersion": "R3"})).unwrap();
    assert_eq!(h.read().unwrap(), json!({"grantVersion": "R3"}));

    assert_eq!(h.erase().unwrap().as_str(), "3");
    assert_eq!(h.read().unwrap(), json!({"grantVersion": "R2"}));
}

#[test]
fn test_creation_order_beats_lexical_value() {
    let h = Harness::memory();
    h.write("R2", json!({"which": "R2"})).unwrap();
    h.write("R1", json!({"which": "R1"})).unwrap();
    assert_eq!(h.read().unwrap(), json!({"which": "R1"}));

    let h = Harness::memory();
    h.write("9", json!({"which": 9})).unwrap();
    h.write("10", json!({"which": 10})).unwrap();
    assert_eq!(h.read().unwrap(), json!({"which": 10}));
}

#[test]
fn test_single_version_erase_leaves_nothing() {
    let h = Harness::memory();
    h.write("1", json!({})).unwrap();
    h.erase().unwrap();
    assert!(matches!(h.read().unwrap_err(), Error::NotFound { .. }));
    assert!(matches!(h.erase().unwrap_err(), Error::NotFound { .. }));
}

#[test]
fn test_never_written_is_not_found() {
    let h = Harness::memory();
    assert!(matches!(h.read().unwrap_err(), Error::NotFound { .. }));
    assert!(matches!(h.erase().unwrap_err(), Error::NotFound { .. }));
}

#[test]
fn test_missing_attribute_is_malformed_everywhere() {
    let h = Harness::memory();
    let err = h
        .gate
        .write_command(json!({
            "businessId": "b", "grantId": "g", "grantVersion": "1", "state": {}
        }))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedRequest { .. }));

    let partial = vec![("businessId".to_string(), "b".to_string())];
    assert!(matches!(
        h.gate.fetch_command(&partial).unwrap_err(),
        Error::MalformedRequest { .. }
    ));
    assert!(matches!(
        h.gate.erase_command(&partial).unwrap_err(),
        Error::MalformedRequest { .. }
    ));
}

#[test]
fn test_versions_listing() {
    let h = Harness::memory();
    h.write("b", json!({})).unwrap();
    h.write("a", json!({})).unwrap();
    h.write("b", json!({"again": true})).unwrap();

    let key = h.gate.query_key(&h.params()).unwrap();
    let out = h.executor.execute(Command::StateVersions { key }).unwrap();
    assert_eq!(
        out,
        Output::Versions(vec![VersionTag::new("b").unwrap(), VersionTag::new("a").unwrap()])
    );
}

// ============================================================================
// Durable backend
// ============================================================================

#[test]
fn test_log_state_survives_reopen_with_creation_order() {
    let temp = TempDir::new().unwrap();
    let open = || StateRepository::builder().log(temp.path()).build().unwrap();

    let (business, user) = {
        let h = Harness::over(open());
        h.write("R2", json!({"v": "R2"})).unwrap();
        h.write("R1", json!({"v": "R1"})).unwrap();
        h.write("R2", json!({"v": "R2b"})).unwrap();
        (h.business, h.user)
    };

    let mut h = Harness::over(open());
    h.business = business;
    h.user = user;
    assert_eq!(h.read().unwrap(), json!({"v": "R1"}));
    assert_eq!(h.erase().unwrap().as_str(), "R1");
    assert_eq!(h.read().unwrap(), json!({"v": "R2b"}));
}

#[test]
fn test_torn_log_tail_is_dropped() {
    let temp = TempDir::new().unwrap();
    let open = || StateRepository::builder().log(temp.path()).build().unwrap();

    let (business, user) = {
        let h = Harness::over(open());
        h.write("1", json!({"v": 1})).unwrap();
        (h.business, h.user)
    };

    // Half a frame: a length prefix promising more bytes than follow
    let mut file = OpenOptions::new()
        .append(true)
        .open(temp.path().join(LOG_FILE_NAME))
        .unwrap();
    file.write_all(&[200, 0, 0, 0, b'{', b'"']).unwrap();
    drop(file);

    let mut h = Harness::over(open());
    h.business = business;
    h.user = user;
    assert_eq!(h.read().unwrap(), json!({"v": 1}));
    h.write("2", json!({"v": 2})).unwrap();
    assert_eq!(h.read().unwrap(), json!({"v": 2}));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Erasing repeatedly walks back through distinct tags in reverse creation order
    #[test]
    fn erase_walks_back_in_creation_order(
        tags in prop::collection::hash_set("[A-Za-z0-9]{1,6}", 1..10)
    ) {
        let tags: Vec<String> = tags.into_iter().collect();
        let h = Harness::memory();
        for (i, tag) in tags.iter().enumerate() {
            h.write(tag, json!({ "i": i })).unwrap();
        }
        for (i, tag) in tags.iter().enumerate().rev() {
            prop_assert_eq!(h.read().unwrap(), json!({ "i": i }));
            let erased = h.erase().unwrap();
            prop_assert_eq!(erased.as_str(), tag.as_str());
        }
        let is_not_found = matches!(h.read().unwrap_err(), Error::NotFound { .. });
        prop_assert!(is_not_found);
    }
}
