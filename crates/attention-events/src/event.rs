//! Attention Event Types
//!
//! Serialization structs for the engine's lifecycle event stream.

use serde::{Deserialize, Serialize};

/// Generates an event ID with the given sequence number.
pub fn generate_event_id(sequence: u64) -> String {
    format!("evt_{:08}", sequence)
}

/// A single logged attention engine event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionEvent {
    pub event_id: String,
    pub tick: u64,
    #[serde(flatten)]
    pub kind: AttentionEventKind,
}

/// Why a machine was removed from tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The host reported the machine destroyed
    Destroyed,
    /// The backing handle was found invalid at the start of a cycle
    StaleHandle,
    /// Removed during a validation sweep after a configuration reload
    Sweep,
}

/// The kinds of events the engine emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttentionEventKind {
    /// A machine entered tracking
    MachineRegistered { unit: u64, group: String },
    /// A machine left tracking
    MachineRemoved { unit: u64, reason: RemovalReason },
    /// A machine's actuator moved to a different tier
    TierChanged {
        unit: u64,
        previous: Option<u32>,
        current: u32,
    },
    /// Parameter cache entries were dropped (one group, or all when `None`)
    CacheInvalidated { group: Option<String> },
    /// Configuration was reloaded and derived tables rebuilt
    ConfigReloaded,
}

impl AttentionEvent {
    pub fn new(event_id: impl Into<String>, tick: u64, kind: AttentionEventKind) -> Self {
        Self {
            event_id: event_id.into(),
            tick,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_format() {
        assert_eq!(generate_event_id(1), "evt_00000001");
        assert_eq!(generate_event_id(12345678), "evt_12345678");
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = AttentionEvent::new(
            generate_event_id(7),
            120,
            AttentionEventKind::TierChanged {
                unit: 42,
                previous: Some(70),
                current: 75,
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: AttentionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_kind_tag_is_flattened() {
        let event = AttentionEvent::new(
            "evt_00000001",
            60,
            AttentionEventKind::MachineRemoved {
                unit: 9,
                reason: RemovalReason::StaleHandle,
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"machine_removed\""));
        assert!(json.contains("\"reason\":\"stale_handle\""));
    }

    #[test]
    fn test_cache_invalidated_all_groups() {
        let event = AttentionEvent::new(
            "evt_00000002",
            0,
            AttentionEventKind::CacheInvalidated { group: None },
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: AttentionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind, AttentionEventKind::CacheInvalidated { group: None });
    }
}
