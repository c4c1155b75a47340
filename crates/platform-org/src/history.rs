//! Subscription audit trail
//!
//! Every successful subscription update appends exactly one history entry
//! holding the state before and after the change. Entries are immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{HistoryId, SubscriptionId};
use crate::subscription::{Subscription, SubscriptionSnapshot};

/// A history entry waiting to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    /// Subscription the change applies to
    pub subscription_id: SubscriptionId,

    /// Identity of the user who made the change
    pub changed_by_user_id: String,

    /// When the change happened
    pub changed_at: DateTime<Utc>,

    /// State before the change, `None` when there was no prior record
    pub previous: Option<SubscriptionSnapshot>,

    /// State after the change
    pub new: SubscriptionSnapshot,

    /// Free-form note
    pub notes: Option<String>,
}

impl NewHistoryEntry {
    /// Record the transition from `previous` to `updated`.
    pub fn transition(
        previous: Option<&Subscription>,
        updated: &Subscription,
        changed_by_user_id: impl Into<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription_id: updated.id,
            changed_by_user_id: changed_by_user_id.into(),
            changed_at,
            previous: previous.map(Subscription::snapshot),
            new: updated.snapshot(),
            notes: None,
        }
    }

    /// Attach a note.
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// A stored history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionHistory {
    /// Unique identifier
    pub id: HistoryId,

    /// Subscription the change applies to
    pub subscription_id: SubscriptionId,

    /// Identity of the user who made the change
    pub changed_by_user_id: String,

    /// When the change happened
    pub changed_at: DateTime<Utc>,

    /// State before the change
    pub previous: Option<SubscriptionSnapshot>,

    /// State after the change
    pub new: SubscriptionSnapshot,

    /// Free-form note
    pub notes: Option<String>,
}

impl SubscriptionHistory {
    /// Materialize a pending entry under the given id.
    pub fn from_entry(id: HistoryId, entry: NewHistoryEntry) -> Self {
        Self {
            id,
            subscription_id: entry.subscription_id,
            changed_by_user_id: entry.changed_by_user_id,
            changed_at: entry.changed_at,
            previous: entry.previous,
            new: entry.new,
            notes: entry.notes,
        }
    }

    /// Whether the plan reference changed.
    pub fn plan_changed(&self) -> bool {
        self.previous
            .as_ref()
            .map_or(true, |previous| previous.plan_id != self.new.plan_id)
    }

    /// Whether the status changed.
    pub fn status_changed(&self) -> bool {
        self.previous
            .as_ref()
            .map_or(true, |previous| previous.status != self.new.status)
    }
}
