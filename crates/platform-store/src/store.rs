//! The storage traits that backends implement.
//!
//! Every read and write goes through a [`Transaction`] obtained from
//! [`Store::begin`]. A transaction is a unit of work: nothing it stages is
//! visible to others until [`Transaction::commit`], and dropping it without
//! committing discards everything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_org::{
    NewHistoryEntry, NewOrganization, NewSubscription, Organization, OrganizationId, Plan, PlanId,
    PlanTemplate, Subscription, SubscriptionHistory, SubscriptionId,
};

use crate::error::StoreResult;

/// CRUD over plan definitions.
#[async_trait]
pub trait PlanStore: Send {
    /// Insert a plan and assign its id.
    async fn create_plan(&mut self, template: PlanTemplate) -> StoreResult<Plan>;

    /// Get a plan by id.
    async fn find_plan(&mut self, id: PlanId) -> StoreResult<Option<Plan>>;

    /// All public plans, ordered by name.
    async fn find_public_plans(&mut self) -> StoreResult<Vec<Plan>>;

    /// Admin listing over every plan regardless of visibility.
    ///
    /// `search` is a case-insensitive substring of the name (empty matches
    /// all). Results are ordered by name; `limit = None` means unbounded.
    async fn find_plans_admin(
        &mut self,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<Vec<Plan>>;

    /// Overwrite a stored plan. `NotFound` when it does not exist.
    async fn update_plan(&mut self, plan: Plan) -> StoreResult<Plan>;

    /// Physically remove a plan. Callers decide whether removal is allowed.
    async fn delete_plan(&mut self, id: PlanId) -> StoreResult<()>;

    /// Number of subscriptions whose current plan is `id`.
    async fn count_subscriptions_referencing(&mut self, id: PlanId) -> StoreResult<u64>;

    /// Total number of plans.
    async fn count_plans(&mut self) -> StoreResult<u64>;
}

/// CRUD over subscription records, one per organization.
#[async_trait]
pub trait SubscriptionStore: Send {
    /// Insert an active subscription. `AlreadyExists` when the organization
    /// already has one.
    async fn insert_subscription(&mut self, new: NewSubscription) -> StoreResult<Subscription>;

    /// The subscription of an organization, whatever its status.
    async fn find_subscription_by_organization(
        &mut self,
        organization_id: OrganizationId,
    ) -> StoreResult<Option<Subscription>>;

    /// The subscription of an organization if it is active and ends after `now`.
    async fn find_active_subscription(
        &mut self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Subscription>>;

    /// Overwrite a stored subscription. `NotFound` when it does not exist.
    async fn update_subscription(&mut self, subscription: Subscription) -> StoreResult<Subscription>;

    /// Move every active subscription whose end date lies before `now` to
    /// `expired` and return how many changed. Running it again without new
    /// lapses changes nothing and returns 0.
    async fn sweep_expired(&mut self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Append-only subscription audit log.
#[async_trait]
pub trait HistoryStore: Send {
    /// Append an entry and assign its id.
    async fn append_history(&mut self, entry: NewHistoryEntry) -> StoreResult<SubscriptionHistory>;

    /// Entries for one subscription, oldest first.
    async fn find_history(
        &mut self,
        subscription_id: SubscriptionId,
    ) -> StoreResult<Vec<SubscriptionHistory>>;
}

/// Organization rows, shared with the membership subsystem.
#[async_trait]
pub trait OrganizationStore: Send {
    /// Insert an organization and assign its id.
    async fn insert_organization(&mut self, new: NewOrganization) -> StoreResult<Organization>;

    /// Get an organization by id.
    async fn find_organization(&mut self, id: OrganizationId) -> StoreResult<Option<Organization>>;

    /// Admin listing of organizations, same filtering and paging as
    /// [`PlanStore::find_plans_admin`].
    async fn find_organizations(
        &mut self,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<Vec<Organization>>;

    /// Overwrite a stored organization. `NotFound` when it does not exist.
    async fn update_organization(&mut self, organization: Organization) -> StoreResult<Organization>;
}

/// An atomic unit of work over all four tables.
#[async_trait]
pub trait Transaction: PlanStore + SubscriptionStore + HistoryStore + OrganizationStore {
    /// Make every staged change visible at once.
    async fn commit(self) -> StoreResult<()>;

    /// Discard every staged change. Dropping the transaction does the same.
    async fn rollback(self) -> StoreResult<()>;
}

/// A backend that hands out transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Transaction type of this backend
    type Tx: Transaction;

    /// Open a transaction.
    async fn begin(&self) -> StoreResult<Self::Tx>;
}
