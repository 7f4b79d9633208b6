use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a checkout order.
///
/// The saga mints the id before the order is persisted, so the same id
/// survives a failed create attempt and can be correlated across logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Mints a fresh order id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an id read back from storage or parsed from a request path.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The raw UUID, for binding into queries.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_do_not_collide() {
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn round_trips_through_the_raw_uuid() {
        let raw = Uuid::new_v4();
        assert_eq!(OrderId::from_uuid(raw).as_uuid(), raw);
    }

    #[test]
    fn serializes_as_a_bare_uuid_string() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
