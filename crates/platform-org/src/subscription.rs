//! Subscription domain models
//!
//! A subscription is the billing and quota state of one organization. It
//! points at the plan currently in force and moves through the statuses
//! below. Subscriptions are never deleted; they only change status.
//!
//! ```text
//! any ──► paused      paused_at = now, cancelled_at cleared
//! any ──► cancelled   cancelled_at = now, paused_at cleared
//! any ──► active      both timestamps cleared
//! active ──► expired  expiry sweep only, once ended_at < now
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ValidationError, ValidityError};
use crate::ids::{OrganizationId, PlanId, SubscriptionId};
use crate::validity::ValidityPeriod;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In force
    Active,

    /// Suspended by an administrator; access is denied
    Paused,

    /// Will not renew; access continues until the end date
    Cancelled,

    /// End date passed; set only by the expiry sweep
    Expired,
}

impl SubscriptionStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "paused" => Ok(SubscriptionStatus::Paused),
            "cancelled" | "canceled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// Fields needed to insert a subscription; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    /// Owning organization
    pub organization_id: OrganizationId,

    /// Plan in force
    pub plan_id: PlanId,

    /// Start of the validity window
    pub started_at: DateTime<Utc>,

    /// End of the validity window
    pub ended_at: Option<DateTime<Utc>>,
}

/// The subscription of one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    /// Unique identifier
    pub id: SubscriptionId,

    /// Owning organization (unique across subscriptions)
    pub organization_id: OrganizationId,

    /// Plan currently in force
    pub plan_id: PlanId,

    /// Current status
    pub status: SubscriptionStatus,

    /// Start of the validity window
    pub started_at: DateTime<Utc>,

    /// End of the validity window. `None` means undetermined, which access
    /// enforcement treats as invalid rather than unlimited.
    pub ended_at: Option<DateTime<Utc>>,

    /// When the subscription was paused, while paused
    pub paused_at: Option<DateTime<Utc>>,

    /// When the subscription was cancelled, while cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Build an active subscription from insert parameters.
    pub fn activate(id: SubscriptionId, new: NewSubscription) -> Self {
        Self {
            id,
            organization_id: new.organization_id,
            plan_id: new.plan_id,
            status: SubscriptionStatus::Active,
            started_at: new.started_at,
            ended_at: new.ended_at,
            paused_at: None,
            cancelled_at: None,
        }
    }

    /// Apply a user-requested status change.
    ///
    /// Returns `Ok(false)` when `target` equals the current status.
    /// Moving to `Expired` by hand is refused.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use platform_org::{NewSubscription, OrganizationId, PlanId, Subscription, SubscriptionId, SubscriptionStatus};
    ///
    /// let now = Utc::now();
    /// let mut sub = Subscription::activate(SubscriptionId::generate(), NewSubscription {
    ///     organization_id: OrganizationId::generate(),
    ///     plan_id: PlanId::generate(),
    ///     started_at: now,
    ///     ended_at: None,
    /// });
    ///
    /// assert!(sub.transition_to(SubscriptionStatus::Paused, now).unwrap());
    /// assert_eq!(sub.paused_at, Some(now));
    /// ```
    pub fn transition_to(
        &mut self,
        target: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationError> {
        if self.status == target {
            return Ok(false);
        }

        match target {
            SubscriptionStatus::Paused => {
                self.paused_at = Some(now);
                self.cancelled_at = None;
            }
            SubscriptionStatus::Cancelled => {
                self.cancelled_at = Some(now);
                self.paused_at = None;
            }
            SubscriptionStatus::Active => {
                self.paused_at = None;
                self.cancelled_at = None;
            }
            SubscriptionStatus::Expired => return Err(ValidationError::ManualExpiry),
        }
        self.status = target;
        Ok(true)
    }

    /// Push the end date out by `period`, counting from the current end
    /// date, or from `now` when none is set.
    pub fn extend(
        &mut self,
        period: &ValidityPeriod,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ValidityError> {
        let base = self.ended_at.unwrap_or(now);
        let ended_at = period.add_to(base)?;
        self.ended_at = Some(ended_at);
        Ok(ended_at)
    }

    /// Active with an end date strictly after `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && matches!(self.ended_at, Some(end) if end > now)
    }

    /// Active but its end date has passed; the sweep will expire it.
    pub fn is_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && matches!(self.ended_at, Some(end) if end < now)
    }

    /// Capture the state recorded in history entries.
    pub fn snapshot(&self) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            plan_id: self.plan_id,
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            paused_at: self.paused_at,
            cancelled_at: self.cancelled_at,
        }
    }
}

/// Point-in-time copy of a subscription's mutable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    /// Plan in force
    pub plan_id: PlanId,

    /// Status
    pub status: SubscriptionStatus,

    /// Start of the validity window
    pub started_at: DateTime<Utc>,

    /// End of the validity window
    pub ended_at: Option<DateTime<Utc>>,

    /// Pause timestamp
    pub paused_at: Option<DateTime<Utc>>,

    /// Cancellation timestamp
    pub cancelled_at: Option<DateTime<Utc>>,
}
