//! Audit trail for allocation-changing operations.
//!
//! Each service writes one entry per business-level change (an order
//! processed, an order or line cancelled, a SKU corrected, a line rewound).
//! Entries are append-only and carry JSON snapshots of the changed values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use wms_core::{AuditId, Entity};

use crate::store::{AuditStore, StoreResult};

/// Record family an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTable {
    Orders,
    LineItems,
    Skus,
}

impl AuditTable {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditTable::Orders => "orders",
            AuditTable::LineItems => "line_items",
            AuditTable::Skus => "skus",
        }
    }
}

impl core::fmt::Display for AuditTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Allocate,
    Cancel,
    Correct,
    Rewind,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Allocate => "ALLOCATE",
            AuditAction::Cancel => "CANCEL",
            AuditAction::Correct => "CORRECT",
            AuditAction::Rewind => "REWIND",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: AuditId,
    pub table_name: AuditTable,
    pub record_id: String,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<JsonValue>,
    pub changed_by: String,
    pub changed_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEntry {
    pub fn new(
        table_name: AuditTable,
        record_id: impl Into<String>,
        action: AuditAction,
        changed_by: impl Into<String>,
    ) -> Self {
        Self {
            audit_id: AuditId::new(),
            table_name,
            record_id: record_id.into(),
            action,
            old_value: None,
            new_value: None,
            changed_by: changed_by.into(),
            changed_date: Utc::now(),
            reason: None,
        }
    }

    pub fn with_change(mut self, old_value: JsonValue, new_value: JsonValue) -> Self {
        self.old_value = Some(old_value);
        self.new_value = Some(new_value);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Entity for AuditEntry {
    type Id = AuditId;

    fn id(&self) -> &Self::Id {
        &self.audit_id
    }
}

/// Audit store handle bound to the actor changes are attributed to.
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    actor: String,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>, actor: impl Into<String>) -> Self {
        Self {
            store,
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// A blank entry attributed to this trail's actor.
    pub fn entry(
        &self,
        table_name: AuditTable,
        record_id: impl Into<String>,
        action: AuditAction,
    ) -> AuditEntry {
        AuditEntry::new(table_name, record_id, action, self.actor.clone())
    }

    pub fn record(&self, entry: AuditEntry) -> StoreResult<()> {
        tracing::debug!(
            table = %entry.table_name,
            record_id = %entry.record_id,
            action = %entry.action,
            "audit entry recorded"
        );
        self.store.record(&entry)
    }
}

impl core::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_serializes_with_uppercase_action() {
        let entry = AuditEntry::new(AuditTable::Skus, "SKU001", AuditAction::Correct, "system")
            .with_change(json!({"total_quantity": 100}), json!({"total_quantity": 50}))
            .with_reason("cycle count");
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["action"], "CORRECT");
        assert_eq!(v["table_name"], "skus");
        assert_eq!(v["new_value"]["total_quantity"], 50);
        assert_eq!(v["reason"], "cycle count");

        let back: AuditEntry = serde_json::from_value(v).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let entry = AuditEntry::new(AuditTable::Orders, "ORD001", AuditAction::Cancel, "system");
        let v = serde_json::to_value(&entry).unwrap();
        assert!(v.get("old_value").is_none());
        assert!(v.get("reason").is_none());
    }
}
