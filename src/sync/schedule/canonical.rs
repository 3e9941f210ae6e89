//! Canonical serialization and hashing of hours collections.
//!
//! The canonical JSON form is a compatibility contract: it is the input to
//! the hash that decides whether two systems agree. Field order comes from
//! the struct declarations, zero minutes and absent optionals are omitted,
//! and items are emitted in each collection's canonical sort order.

use {
    crate::sync::error::Result,
    serde::Serialize,
    sha2::{
        Digest,
        Sha256,
    },
    std::fmt,
};

/// Lowercase hex SHA-256 of a canonical serialization.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CanonicalHash(String);

impl CanonicalHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A collection with a single deterministic ordering and serialization.
///
/// Equality of two collections is defined as equality of their canonical
/// hashes; no field-by-field diff is ever computed.
pub trait Canonical {
    type Item: Serialize + Clone;

    /// Items in canonical order.
    fn canonical_items(&self) -> Vec<Self::Item>;

    fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.canonical_items())?)
    }

    fn canonical_hash(&self) -> Result<CanonicalHash> {
        let json = self.canonical_json()?;
        Ok(CanonicalHash::of(json.as_bytes()))
    }

    fn canonical_eq(&self, other: &Self) -> Result<bool>
    where
        Self: Sized,
    {
        Ok(self.canonical_hash()? == other.canonical_hash()?)
    }
}
