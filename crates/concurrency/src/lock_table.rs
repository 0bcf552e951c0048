//! Key-sharded lock table
//!
//! Serializes multi-step operations on one business key (resolve then
//! remove, list then get) without a global lock.
//!
//! # Design
//!
//! A fixed array of `parking_lot::RwLock<()>` stripes. A key maps to the
//! stripe `fxhash(key) % stripes`. Writers of one key always meet on the same
//! stripe; readers of a key share it. Two different keys only contend if they
//! hash to the same stripe, so the stripe count bounds false sharing while
//! the table never grows, no matter how many keys come and go.
//!
//! parking_lot locks do not poison.

use std::hash::{Hash, Hasher};

use grantstate_core::BusinessKey;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHasher;

/// Default number of stripes
pub const DEFAULT_STRIPES: usize = 64;

/// Shared access to one key's stripe
pub type KeyReadGuard<'a> = RwLockReadGuard<'a, ()>;

/// Exclusive access to one key's stripe
pub type KeyWriteGuard<'a> = RwLockWriteGuard<'a, ()>;

/// Striped reader/writer locks indexed by business key
///
/// # Example
///
/// ```
/// use grantstate_concurrency::LockTable;
/// use grantstate_core::KeySchema;
///
/// let locks = LockTable::new(16);
/// let key = KeySchema::farm_business().key(["106", "g"]).unwrap();
/// {
///     let _guard = locks.write(&key);
///     // resolve + remove happen atomically for this key
/// }
/// ```
#[derive(Debug)]
pub struct LockTable {
    stripes: Box<[RwLock<()>]>,
}

impl LockTable {
    /// Create a table with `stripes` locks (at least one)
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| RwLock::new(())).collect(),
        }
    }

    /// Number of stripes
    pub fn stripes(&self) -> usize {
        self.stripes.len()
    }

    /// Stripe index for a key
    #[inline]
    pub fn stripe_of(&self, key: &BusinessKey) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Shared lock for reading `key`
    pub fn read(&self, key: &BusinessKey) -> KeyReadGuard<'_> {
        self.stripes[self.stripe_of(key)].read()
    }

    /// Exclusive lock for mutating `key`
    pub fn write(&self, key: &BusinessKey) -> KeyWriteGuard<'_> {
        self.stripes[self.stripe_of(key)].write()
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
