//! Access enforcement
//!
//! The request layer asks [`SubscriptionGate`] before serving any
//! organization-scoped resource. A subscription is usable while its status
//! is active or cancelled and its end date has not passed. A missing end
//! date counts as invalid, not as unlimited, and a paused subscription is
//! never usable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_org::{OrganizationId, Subscription, SubscriptionStatus};
use platform_store::{PlanStore, Store, SubscriptionStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::engine::{SubscriptionEngine, PLAN_MISSING, SUBSCRIPTION_MISSING};
use crate::error::{SubscriptionError, SubscriptionResult};

/// Outcome of an access check, with the reason for a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// The subscription is usable
    Allowed,
    /// The organization has no subscription
    NoSubscription,
    /// The subscription has no end date
    UndeterminedEnd,
    /// The end date has passed
    Expired,
    /// The subscription is paused
    Paused,
    /// Any other status
    Inactive,
}

impl AccessDecision {
    /// Decide for `subscription` at `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_subscriptions::AccessDecision;
    ///
    /// let decision = AccessDecision::evaluate(None, chrono::Utc::now());
    /// assert_eq!(decision, AccessDecision::NoSubscription);
    /// assert!(!decision.is_allowed());
    /// ```
    pub fn evaluate(subscription: Option<&Subscription>, now: DateTime<Utc>) -> Self {
        let Some(subscription) = subscription else {
            return AccessDecision::NoSubscription;
        };
        let Some(ended_at) = subscription.ended_at else {
            return AccessDecision::UndeterminedEnd;
        };
        if ended_at < now {
            return AccessDecision::Expired;
        }
        match subscription.status {
            SubscriptionStatus::Active | SubscriptionStatus::Cancelled => AccessDecision::Allowed,
            SubscriptionStatus::Paused => AccessDecision::Paused,
            SubscriptionStatus::Expired => AccessDecision::Inactive,
        }
    }

    /// Whether access is granted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    /// Message shown to a member who is turned away.
    pub fn message(&self) -> &'static str {
        match self {
            AccessDecision::Allowed => "Access granted.",
            AccessDecision::NoSubscription => {
                "Your organization does not have an active subscription. Please contact your administrator."
            }
            AccessDecision::UndeterminedEnd => {
                "Your organization subscription has undetermined ending time. Please contact your administrator to renew."
            }
            AccessDecision::Expired => {
                "Your organization's subscription has expired. Please contact your administrator to renew."
            }
            AccessDecision::Paused => {
                "Your organization's subscription is currently paused. Please contact your administrator to resume it."
            }
            AccessDecision::Inactive => {
                "Your organization's subscription is not active. Please contact your administrator."
            }
        }
    }
}

/// Subscription check consumed by the request layer.
#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    /// Decide whether the organization may use the platform right now.
    async fn check_access(&self, organization_id: OrganizationId)
        -> SubscriptionResult<AccessDecision>;

    /// Shorthand for `check_access(..).is_allowed()`.
    async fn is_subscription_usable(&self, organization_id: OrganizationId) -> SubscriptionResult<bool> {
        Ok(self.check_access(organization_id).await?.is_allowed())
    }
}

#[async_trait]
impl<S: Store> SubscriptionGate for SubscriptionEngine<S> {
    #[instrument(skip(self), fields(organization_id = %organization_id))]
    async fn check_access(
        &self,
        organization_id: OrganizationId,
    ) -> SubscriptionResult<AccessDecision> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let subscription = tx.find_subscription_by_organization(organization_id).await?;
        let decision = AccessDecision::evaluate(subscription.as_ref(), now);
        if !decision.is_allowed() {
            debug!(?decision, "Access denied");
        }
        Ok(decision)
    }
}

impl<S: Store> SubscriptionEngine<S> {
    /// Refuse a new member once the plan's member limit is reached.
    ///
    /// `current_members` is the organization's member count as tracked by
    /// the membership subsystem.
    pub async fn ensure_member_capacity(
        &self,
        organization_id: OrganizationId,
        current_members: u64,
    ) -> SubscriptionResult<()> {
        let mut tx = self.store().begin().await?;
        let subscription = tx
            .find_subscription_by_organization(organization_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(SUBSCRIPTION_MISSING))?;
        let plan = tx
            .find_plan(subscription.plan_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(PLAN_MISSING))?;

        if current_members >= u64::from(plan.quota.max_members) {
            return Err(SubscriptionError::LimitReached(
                "Organization member limit reached for current subscription plan".to_string(),
            ));
        }
        Ok(())
    }
}
