//! Identifiers for persisted entities
//!
//! Identifiers are UUID v7 so that ids sort by creation time in the store.

use nutype::nutype;
use uuid::Uuid;

/// Unique identifier for a persisted order
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn generate() -> Self {
        // Uuid::now_v7() generates a time-ordered UUID
        Self::new(Uuid::now_v7())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_generation_is_unique() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_serializes_as_plain_uuid() {
        let id = OrderId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_ref()));
    }
}
