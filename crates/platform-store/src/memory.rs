//! In-memory store implementation.
//!
//! Suitable for single-process deployments and tests. A transaction holds
//! the store's write lock for its whole lifetime and works on a private copy
//! of the tables, so writers are serialized per store and a dropped
//! transaction leaves no trace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_org::{
    HistoryId, NewHistoryEntry, NewOrganization, NewSubscription, Organization, OrganizationId,
    Plan, PlanId, PlanTemplate, Subscription, SubscriptionHistory, SubscriptionId,
    SubscriptionStatus,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    HistoryStore, OrganizationStore, PlanStore, Store, SubscriptionStore, Transaction,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    organizations: BTreeMap<OrganizationId, Organization>,
    plans: BTreeMap<PlanId, Plan>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    history: Vec<SubscriptionHistory>,
}

impl Tables {
    fn subscription_of(&self, organization_id: OrganizationId) -> Option<&Subscription> {
        self.subscriptions
            .values()
            .find(|s| s.organization_id == organization_id)
    }

    fn ensure_plan_exists(&self, plan_id: PlanId) -> StoreResult<()> {
        if self.plans.contains_key(&plan_id) {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!("plan {} does not exist", plan_id)))
        }
    }
}

/// In-memory, transactional store.
///
/// Cloning is cheap and every clone shares the same tables.
///
/// # Example
///
/// ```rust
/// use platform_org::{PlanQuota, PlanTemplate};
/// use platform_store::{MemoryStore, PlanStore, Store, Transaction};
///
/// # async fn example() -> platform_store::StoreResult<()> {
/// let store = MemoryStore::new();
///
/// let mut tx = store.begin().await?;
/// let plan = tx.create_plan(PlanTemplate::new("Team", PlanQuota::default())).await?;
/// tx.commit().await?;
///
/// let mut tx = store.begin().await?;
/// assert!(tx.find_plan(plan.id).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let guard = self.tables.clone().write_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction { guard, staged })
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    staged: Tables,
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("plans", &self.staged.plans.len())
            .field("subscriptions", &self.staged.subscriptions.len())
            .finish()
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self) -> StoreResult<()> {
        let MemoryTransaction { mut guard, staged } = self;
        *guard = staged;
        debug!("Committed memory transaction");
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        debug!("Rolled back memory transaction");
        Ok(())
    }
}

#[async_trait]
impl PlanStore for MemoryTransaction {
    async fn create_plan(&mut self, template: PlanTemplate) -> StoreResult<Plan> {
        let plan = Plan::from_template(PlanId::generate(), template);
        self.staged.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn find_plan(&mut self, id: PlanId) -> StoreResult<Option<Plan>> {
        Ok(self.staged.plans.get(&id).cloned())
    }

    async fn find_public_plans(&mut self) -> StoreResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .staged
            .plans
            .values()
            .filter(|p| p.is_public)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(plans)
    }

    async fn find_plans_admin(
        &mut self,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<Vec<Plan>> {
        let needle = search.trim().to_lowercase();
        let mut plans: Vec<Plan> = self
            .staged
            .plans
            .values()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let page = plans.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    async fn update_plan(&mut self, plan: Plan) -> StoreResult<Plan> {
        match self.staged.plans.get_mut(&plan.id) {
            Some(stored) => {
                *stored = plan.clone();
                Ok(plan)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_plan(&mut self, id: PlanId) -> StoreResult<()> {
        self.staged
            .plans
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn count_subscriptions_referencing(&mut self, id: PlanId) -> StoreResult<u64> {
        let count = self
            .staged
            .subscriptions
            .values()
            .filter(|s| s.plan_id == id)
            .count();
        Ok(count as u64)
    }

    async fn count_plans(&mut self) -> StoreResult<u64> {
        Ok(self.staged.plans.len() as u64)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryTransaction {
    async fn insert_subscription(&mut self, new: NewSubscription) -> StoreResult<Subscription> {
        if self.staged.subscription_of(new.organization_id).is_some() {
            return Err(StoreError::AlreadyExists);
        }
        self.staged.ensure_plan_exists(new.plan_id)?;

        let subscription = Subscription::activate(SubscriptionId::generate(), new);
        self.staged
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn find_subscription_by_organization(
        &mut self,
        organization_id: OrganizationId,
    ) -> StoreResult<Option<Subscription>> {
        Ok(self.staged.subscription_of(organization_id).cloned())
    }

    async fn find_active_subscription(
        &mut self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Subscription>> {
        Ok(self
            .staged
            .subscription_of(organization_id)
            .filter(|s| s.is_active_at(now))
            .cloned())
    }

    async fn update_subscription(&mut self, subscription: Subscription) -> StoreResult<Subscription> {
        self.staged.ensure_plan_exists(subscription.plan_id)?;
        match self.staged.subscriptions.get_mut(&subscription.id) {
            Some(stored) => {
                *stored = subscription.clone();
                Ok(subscription)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn sweep_expired(&mut self, now: DateTime<Utc>) -> StoreResult<u64> {
        let lapsed: Vec<SubscriptionId> = self
            .staged
            .subscriptions
            .values()
            .filter(|s| s.is_lapsed_at(now))
            .map(|s| s.id)
            .collect();

        for id in &lapsed {
            if let Some(subscription) = self.staged.subscriptions.get_mut(id) {
                subscription.status = SubscriptionStatus::Expired;
            }
        }

        debug!(count = lapsed.len(), "Marked lapsed subscriptions expired");
        Ok(lapsed.len() as u64)
    }
}

#[async_trait]
impl HistoryStore for MemoryTransaction {
    async fn append_history(&mut self, entry: NewHistoryEntry) -> StoreResult<SubscriptionHistory> {
        if !self.staged.subscriptions.contains_key(&entry.subscription_id) {
            return Err(StoreError::Conflict(format!(
                "subscription {} does not exist",
                entry.subscription_id
            )));
        }
        let history = SubscriptionHistory::from_entry(HistoryId::generate(), entry);
        self.staged.history.push(history.clone());
        Ok(history)
    }

    async fn find_history(
        &mut self,
        subscription_id: SubscriptionId,
    ) -> StoreResult<Vec<SubscriptionHistory>> {
        Ok(self
            .staged
            .history
            .iter()
            .filter(|h| h.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrganizationStore for MemoryTransaction {
    async fn insert_organization(&mut self, new: NewOrganization) -> StoreResult<Organization> {
        let organization = Organization::from_new(OrganizationId::generate(), new);
        self.staged
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn find_organization(&mut self, id: OrganizationId) -> StoreResult<Option<Organization>> {
        Ok(self.staged.organizations.get(&id).cloned())
    }

    async fn find_organizations(
        &mut self,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<Vec<Organization>> {
        let needle = search.trim().to_lowercase();
        let mut organizations: Vec<Organization> = self
            .staged
            .organizations
            .values()
            .filter(|o| needle.is_empty() || o.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        organizations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let page = organizations.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    async fn update_organization(&mut self, organization: Organization) -> StoreResult<Organization> {
        match self.staged.organizations.get_mut(&organization.id) {
            Some(stored) => {
                *stored = organization.clone();
                Ok(organization)
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use platform_org::PlanQuota;
    use rust_decimal::Decimal;

    async fn seeded() -> (MemoryStore, OrganizationId, Plan) {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let org = tx.insert_organization(NewOrganization::new("Acme")).await.unwrap();
        let plan = tx
            .create_plan(PlanTemplate::new("Team", PlanQuota::default()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, org.id, plan)
    }

    fn new_subscription(org: OrganizationId, plan: PlanId, ended_at: DateTime<Utc>) -> NewSubscription {
        NewSubscription {
            organization_id: org,
            plan_id: plan,
            started_at: ended_at - Duration::days(365),
            ended_at: Some(ended_at),
        }
    }

    #[tokio::test]
    async fn test_commit_makes_changes_visible() {
        let (store, org, plan) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_organization(org).await.unwrap().unwrap().name, "Acme");
        assert_eq!(tx.find_plan(plan.id).await.unwrap(), Some(plan));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (store, org, plan) = seeded().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.delete_plan(plan.id).await.unwrap();
            let mut renamed = tx.find_organization(org).await.unwrap().unwrap();
            renamed.name = "Renamed".to_string();
            tx.update_organization(renamed).await.unwrap();
            tx.create_plan(PlanTemplate::new("Stray", PlanQuota::default()))
                .await
                .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_plan(plan.id).await.unwrap().is_some());
        assert_eq!(tx.find_organization(org).await.unwrap().unwrap().name, "Acme");
        assert_eq!(tx.count_plans().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_explicit_rollback() {
        let (store, _, _) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.create_plan(PlanTemplate::new("Stray", PlanQuota::default()))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.count_plans().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_one_subscription_per_organization() {
        let (store, org, plan) = seeded().await;
        let end = Utc::now() + Duration::days(30);

        let mut tx = store.begin().await.unwrap();
        tx.insert_subscription(new_subscription(org, plan.id, end))
            .await
            .unwrap();
        let second = tx
            .insert_subscription(new_subscription(org, plan.id, end))
            .await;
        assert_eq!(second, Err(StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_subscription_requires_existing_plan() {
        let (store, org, _) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let result = tx
            .insert_subscription(new_subscription(org, PlanId::generate(), Utc::now()))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_find_active_subscription() {
        let (store, org, plan) = seeded().await;
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let mut sub = tx
            .insert_subscription(new_subscription(org, plan.id, now + Duration::hours(1)))
            .await
            .unwrap();
        assert!(tx.find_active_subscription(org, now).await.unwrap().is_some());
        assert!(tx
            .find_active_subscription(org, now + Duration::hours(2))
            .await
            .unwrap()
            .is_none());

        sub.status = SubscriptionStatus::Paused;
        tx.update_subscription(sub).await.unwrap();
        assert!(tx.find_active_subscription(org, now).await.unwrap().is_none());
        assert!(tx
            .find_subscription_by_organization(org)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let plan = tx
            .create_plan(PlanTemplate::new("Team", PlanQuota::default()))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (name, offset) in [("lapsed", -1), ("current", 1), ("paused", -1)] {
            let org = tx.insert_organization(NewOrganization::new(name)).await.unwrap();
            let mut sub = tx
                .insert_subscription(new_subscription(org.id, plan.id, now + Duration::days(offset)))
                .await
                .unwrap();
            if name == "paused" {
                sub.status = SubscriptionStatus::Paused;
                sub = tx.update_subscription(sub).await.unwrap();
            }
            ids.push((name, org.id, sub.id));
        }
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.sweep_expired(now).await.unwrap(), 1);
        assert_eq!(tx.sweep_expired(now).await.unwrap(), 0);
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        for (name, org, _) in ids {
            let status = tx
                .find_subscription_by_organization(org)
                .await
                .unwrap()
                .unwrap()
                .status;
            let expected = match name {
                "lapsed" => SubscriptionStatus::Expired,
                "current" => SubscriptionStatus::Active,
                _ => SubscriptionStatus::Paused,
            };
            assert_eq!(status, expected, "{name}");
        }
    }

    #[tokio::test]
    async fn test_sweep_ignores_open_ended_subscriptions() {
        let (store, org, plan) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_subscription(NewSubscription {
            organization_id: org,
            plan_id: plan.id,
            started_at: Utc::now() - Duration::days(10),
            ended_at: None,
        })
        .await
        .unwrap();
        assert_eq!(tx.sweep_expired(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_plan_listings() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for template in PlanTemplate::default_catalog() {
            tx.create_plan(template).await.unwrap();
        }
        tx.create_plan(
            PlanTemplate::new("Custom Plan for Org 7", PlanQuota::default())
                .with_price(Some(Decimal::from(99))),
        )
        .await
        .unwrap();

        let public: Vec<String> = tx
            .find_public_plans()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(public, ["Free", "Gold", "Pro"]);

        assert_eq!(tx.find_plans_admin("", None, 0).await.unwrap().len(), 4);
        let custom = tx.find_plans_admin("custom", None, 0).await.unwrap();
        assert_eq!(custom.len(), 1);
        assert!(!custom[0].is_public);

        let page = tx.find_plans_admin("", Some(2), 1).await.unwrap();
        let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Free", "Gold"]);
    }

    #[tokio::test]
    async fn test_organization_listing() {
        let (store, _, _) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        for name in ["Globex", "Acme Labs", "Initech"] {
            tx.insert_organization(NewOrganization::new(name)).await.unwrap();
        }

        let all: Vec<String> = tx
            .find_organizations("", None, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(all, ["Acme", "Acme Labs", "Globex", "Initech"]);

        let acme = tx.find_organizations("  ACME ", None, 0).await.unwrap();
        assert_eq!(acme.len(), 2);

        let page = tx.find_organizations("", Some(2), 1).await.unwrap();
        let names: Vec<_> = page.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Acme Labs", "Globex"]);
        assert!(tx.find_organizations("", None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reference_count_and_delete() {
        let (store, org, plan) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.count_subscriptions_referencing(plan.id).await.unwrap(), 0);

        tx.insert_subscription(new_subscription(org, plan.id, Utc::now()))
            .await
            .unwrap();
        assert_eq!(tx.count_subscriptions_referencing(plan.id).await.unwrap(), 1);

        assert_eq!(tx.delete_plan(PlanId::generate()).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_subscription() {
        let (store, org, plan) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let sub = tx
            .insert_subscription(new_subscription(org, plan.id, Utc::now()))
            .await
            .unwrap();

        for user in ["alice", "bob"] {
            tx.append_history(NewHistoryEntry::transition(Some(&sub), &sub, user, Utc::now()))
                .await
                .unwrap();
        }

        let history = tx.find_history(sub.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].changed_by_user_id, "alice");
        assert!(tx.find_history(SubscriptionId::generate()).await.unwrap().is_empty());

        let orphan = NewHistoryEntry::transition(None, &sub, "eve", Utc::now());
        let orphan = NewHistoryEntry {
            subscription_id: SubscriptionId::generate(),
            ..orphan
        };
        assert!(matches!(
            tx.append_history(orphan).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
