//! Snapshot record types.
//!
//! A snapshot is an immutable entry in a per-entity-type history log,
//! capturing one mutation of one entity.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::error::{RewindError, RewindResult};

/// Identifier of a snapshot record.
pub type SnapshotId = Uuid;

/// Projected entity state embedded in a snapshot.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Mutation that produced a snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SnapshotAction {
    /// First save of an entity.
    Create,
    /// Any later save.
    Update,
    /// Save issued by a rollback.
    RollBack,
    /// Entity removal (tombstone, no payload).
    Delete,
}

impl SnapshotAction {
    /// Storage representation, always lower-case.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Parse an action tag, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> RewindResult<Self> {
        s.trim()
            .to_lowercase()
            .parse()
            .map_err(|_| RewindError::invalid_action(s))
    }

    /// Whether records with this action carry a payload.
    pub fn has_payload(&self) -> bool {
        !matches!(self, Self::Delete)
    }
}

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Snapshot identifier.
    pub id: SnapshotId,
    /// Entity this snapshot belongs to.
    pub entity_id: String,
    /// When the mutation happened.
    pub timestamp: DateTime<Utc>,
    /// What kind of mutation this was.
    pub action: SnapshotAction,
    /// Snapshot whose payload was restored (roll-back only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_of: Option<SnapshotId>,
    /// Projected entity state (absent for delete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl SnapshotRecord {
    fn new(
        entity_id: impl Into<String>,
        action: SnapshotAction,
        rollback_of: Option<SnapshotId>,
        payload: Option<Payload>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: entity_id.into(),
            // Stores keep microsecond precision.
            timestamp: Utc::now().trunc_subsecs(6),
            action,
            rollback_of,
            payload,
        }
    }

    /// Snapshot for the first save of an entity.
    pub fn created(entity_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(entity_id, SnapshotAction::Create, None, Some(payload))
    }

    /// Snapshot for a later save of an entity.
    pub fn updated(entity_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(entity_id, SnapshotAction::Update, None, Some(payload))
    }

    /// Snapshot for a save that restored the payload of `rollback_of`.
    pub fn rolled_back(
        entity_id: impl Into<String>,
        payload: Payload,
        rollback_of: SnapshotId,
    ) -> Self {
        Self::new(
            entity_id,
            SnapshotAction::RollBack,
            Some(rollback_of),
            Some(payload),
        )
    }

    /// Tombstone written before an entity is removed.
    pub fn deleted(entity_id: impl Into<String>) -> Self {
        Self::new(entity_id, SnapshotAction::Delete, None, None)
    }

    /// Builder: override the event time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(6);
        self
    }

    /// Check the record's shape.
    ///
    /// `rollback_of` must be set exactly for roll-back records and `payload`
    /// must be absent exactly for delete records.
    pub fn validate(&self) -> RewindResult<()> {
        if self.entity_id.is_empty() {
            return Err(RewindError::missing_field("entity_id"));
        }

        match (self.action, self.rollback_of.is_some()) {
            (SnapshotAction::RollBack, false) => {
                return Err(RewindError::missing_field("rollback_of"))
            }
            (action, true) if action != SnapshotAction::RollBack => {
                return Err(RewindError::validation(format!(
                    "rollback_of is only allowed on roll-back snapshots, found on {}",
                    action
                )))
            }
            _ => {}
        }

        match (self.action.has_payload(), self.payload.is_some()) {
            (true, false) => Err(RewindError::missing_field("payload")),
            (false, true) => Err(RewindError::validation(
                "delete snapshots must not carry a payload",
            )),
            _ => Ok(()),
        }
    }
}
