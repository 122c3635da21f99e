//! Element identifiers.
//!
//! Every detected topper, support element and message carries an
//! [`ElementId`]. The id either comes from the analysis payload or is minted
//! once at ingest, and from then on it is how mutations, reverts and markers
//! address the element. Ids are interned so they stay `Copy` and compare by
//! index.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every id string seen by this process, payload-supplied or minted.
static ID_TABLE: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Suffix source for minted ids. Shared across categories.
static MINTED: AtomicU64 = AtomicU64::new(0);

/// Handle for one design element, stable for the life of an analysis.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Spur);

impl ElementId {
    /// The id for `raw`, exactly as written.
    pub fn intern(raw: &str) -> Self {
        ElementId(ID_TABLE.get_or_intern(raw))
    }

    /// The id a payload supplied, or `None` when it is blank.
    pub fn from_payload(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| Self::intern(raw))
    }

    /// Mint a fresh id for an element the payload left unnamed, such as
    /// `topper_3` or `msg_7`. The caller still checks it against ids taken
    /// from the payload.
    pub fn generate(category_prefix: &str) -> Self {
        let n = MINTED.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{category_prefix}_{n}"))
    }

    pub fn as_str(&self) -> &str {
        ID_TABLE.resolve(&self.0)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Plain strings on the wire, matching the analysis payload.

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ElementId::intern(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_payload_id_is_same_element() {
        let a = ElementId::intern("topper_unicorn");
        let b = ElementId::intern("topper_unicorn");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "topper_unicorn");
    }

    #[test]
    fn blank_payload_id_is_rejected() {
        assert_eq!(ElementId::from_payload("   "), None);
        assert_eq!(ElementId::from_payload(" t9 "), Some(ElementId::intern("t9")));
    }

    #[test]
    fn minted_ids_never_repeat() {
        let a = ElementId::generate("msg");
        let b = ElementId::generate("msg");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("msg_"));
    }

    #[test]
    fn displays_as_the_raw_string() {
        let id = ElementId::intern("t1");
        assert_eq!(id.to_string(), "t1");
        assert_eq!(format!("{id:?}"), "ElementId(t1)");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ElementId::intern("cm1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cm1\"");
        let back: ElementId = serde_json::from_str("\"cm1\"").unwrap();
        assert_eq!(back, id);
    }
}
