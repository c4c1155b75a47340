//! Subscription lifecycle engine
//!
//! [`SubscriptionEngine`] owns the rules for creating, updating and expiring
//! subscriptions. Each mutating operation runs inside one store transaction:
//! it either commits completely or, on any error, drops the transaction and
//! leaves organizations, subscriptions, plans and history untouched.

use chrono::{DateTime, Utc};
use platform_org::{
    NewHistoryEntry, NewOrganization, NewSubscription, Organization, OrganizationContact,
    OrganizationId, OrganizationOverview, PlanId, PlanQuota, Subscription, SubscriptionHistory,
    SubscriptionStatus, ValidationError, ValidityPeriod,
};
use platform_store::{
    HistoryStore, OrganizationStore, PlanStore, Store, StoreError, SubscriptionStore, Transaction,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::resolution::{resolve_plan, PlanTerms};

pub(crate) const ORGANIZATION_MISSING: &str = "Organization does not exist";
pub(crate) const SUBSCRIPTION_MISSING: &str = "No subscription found for this organization";
pub(crate) const PLAN_MISSING: &str = "The plan associated with this subscription could not be found";

/// Terms of a new subscription.
///
/// Without a `plan_id` a custom plan is created from the quota fields;
/// omitted fields take the plan column defaults.
///
/// # Examples
///
/// ```
/// use platform_subscriptions::SubscriptionTerms;
///
/// let terms = SubscriptionTerms::new("1 year").with_members(10).with_projects(3);
/// assert_eq!(terms.quota().max_members, 10);
/// assert_eq!(terms.quota().max_projects, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionTerms {
    /// Validity phrase such as `"1 year"`
    pub validity: String,

    /// Existing plan to subscribe to
    pub plan_id: Option<PlanId>,

    /// Member limit of the custom plan
    pub max_members: Option<u32>,

    /// Project limit of the custom plan
    pub max_projects: Option<u32>,

    /// Shared storage per project of the custom plan, in bytes
    pub shared_storage_per_project: Option<u64>,

    /// Private storage per user of the custom plan, in bytes
    pub private_storage_per_user: Option<u64>,

    /// Price of the custom plan
    pub price: Option<Decimal>,

    /// Currency of the custom plan
    pub currency: Option<String>,
}

impl SubscriptionTerms {
    /// Creates terms with only a validity phrase.
    pub fn new(validity: impl Into<String>) -> Self {
        Self {
            validity: validity.into(),
            ..Self::default()
        }
    }

    /// Subscribe to an existing plan.
    pub fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    /// Set the member limit.
    pub fn with_members(mut self, max_members: u32) -> Self {
        self.max_members = Some(max_members);
        self
    }

    /// Set the project limit.
    pub fn with_projects(mut self, max_projects: u32) -> Self {
        self.max_projects = Some(max_projects);
        self
    }

    /// Set both storage limits.
    pub fn with_storage(mut self, shared_per_project: u64, private_per_user: u64) -> Self {
        self.shared_storage_per_project = Some(shared_per_project);
        self.private_storage_per_user = Some(private_per_user);
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// The quota, with defaults for omitted fields.
    pub fn quota(&self) -> PlanQuota {
        let default = PlanQuota::default();
        PlanQuota {
            max_members: self.max_members.unwrap_or(default.max_members),
            max_projects: self.max_projects.unwrap_or(default.max_projects),
            shared_storage_per_project: self
                .shared_storage_per_project
                .unwrap_or(default.shared_storage_per_project),
            private_storage_per_user: self
                .private_storage_per_user
                .unwrap_or(default.private_storage_per_user),
        }
    }
}

/// A full subscription edit as submitted by an administrator.
///
/// Quota, price and currency apply only when the update ends on a custom
/// plan; adopting a public plan keeps that plan's own terms.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSubscription {
    /// Organization display name
    pub display_name: String,

    /// Plan the administrator selected
    pub plan_id: Option<PlanId>,

    /// Requested limits
    pub quota: PlanQuota,

    /// Requested status
    pub status: SubscriptionStatus,

    /// Phrase to add to the current end date, e.g. `"+3 months"`
    pub extend_duration: Option<String>,

    /// Requested price
    pub price: Option<Decimal>,

    /// Requested currency, the configured default when omitted
    pub currency: Option<String>,

    /// Identity of the user making the change
    pub changed_by_user_id: String,

    /// Note stored with the history entry
    pub notes: Option<String>,
}

impl UpdateSubscription {
    /// An update that reproduces the current state of `overview`.
    ///
    /// Callers then change only the fields they care about.
    pub fn from_current(
        overview: &OrganizationOverview,
        changed_by_user_id: impl Into<String>,
    ) -> Self {
        Self {
            display_name: overview.organization.name.clone(),
            plan_id: Some(overview.plan.id),
            quota: overview.plan.quota,
            status: overview.subscription.status,
            extend_duration: None,
            price: overview.plan.price,
            currency: Some(overview.plan.currency.clone()),
            changed_by_user_id: changed_by_user_id.into(),
            notes: None,
        }
    }

    /// Select a plan, or none to keep custom terms.
    pub fn with_plan(mut self, plan_id: Option<PlanId>) -> Self {
        self.plan_id = plan_id;
        self
    }

    /// Set the requested limits.
    pub fn with_quota(mut self, quota: PlanQuota) -> Self {
        self.quota = quota;
        self
    }

    /// Set the requested status.
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = status;
        self
    }

    /// Extend the validity by a phrase such as `"+1 year"`.
    pub fn with_extension(mut self, phrase: impl Into<String>) -> Self {
        self.extend_duration = Some(phrase.into());
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: Option<Decimal>) -> Self {
        self.price = price;
        self
    }

    /// Rename the organization.
    pub fn renamed(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Attach a history note.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The subscription lifecycle engine.
///
/// # Example
///
/// ```rust,no_run
/// use platform_org::NewOrganization;
/// use platform_store::MemoryStore;
/// use platform_subscriptions::{SubscriptionEngine, SubscriptionTerms};
///
/// async fn example() -> platform_subscriptions::SubscriptionResult<()> {
///     let engine = SubscriptionEngine::new(MemoryStore::new());
///
///     let (org, subscription) = engine
///         .provision_organization(
///             NewOrganization::new("Acme"),
///             SubscriptionTerms::new("1 year").with_members(10),
///         )
///         .await?;
///
///     assert_eq!(subscription.organization_id, org.id);
///     Ok(())
/// }
/// ```
pub struct SubscriptionEngine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<S> std::fmt::Debug for SubscriptionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionEngine")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: Store> SubscriptionEngine<S> {
    /// Creates an engine over `store` with the system clock and default
    /// configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, mut config: EngineConfig) -> SubscriptionResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current instant according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create the subscription of an existing organization.
    ///
    /// The validity window is `now .. now + terms.validity`. Fails with
    /// `Conflict` when the organization already has a subscription.
    #[instrument(skip(self, terms), fields(organization_id = %organization_id))]
    pub async fn create_subscription(
        &self,
        organization_id: OrganizationId,
        terms: SubscriptionTerms,
    ) -> SubscriptionResult<Subscription> {
        let now = self.now();
        let mut tx = self.store.begin().await?;

        if tx.find_organization(organization_id).await?.is_none() {
            return Err(SubscriptionError::not_found(ORGANIZATION_MISSING));
        }
        let subscription = self.create_in_tx(&mut tx, organization_id, terms, now).await?;
        tx.commit().await?;

        info!(
            subscription_id = %subscription.id,
            plan_id = %subscription.plan_id,
            "Created subscription"
        );
        Ok(subscription)
    }

    /// Create an organization together with its subscription.
    ///
    /// Both rows are written in one transaction; if the subscription cannot
    /// be created the organization is not stored either.
    #[instrument(skip(self, organization, terms), fields(name = %organization.name))]
    pub async fn provision_organization(
        &self,
        organization: NewOrganization,
        terms: SubscriptionTerms,
    ) -> SubscriptionResult<(Organization, Subscription)> {
        let organization = organization.validated()?;
        let now = self.now();
        let mut tx = self.store.begin().await?;

        let organization = tx.insert_organization(organization).await?;
        let subscription = self
            .create_in_tx(&mut tx, organization.id, terms, now)
            .await?;
        tx.commit().await?;

        info!(
            organization_id = %organization.id,
            subscription_id = %subscription.id,
            "Provisioned organization"
        );
        Ok((organization, subscription))
    }

    async fn create_in_tx(
        &self,
        tx: &mut S::Tx,
        organization_id: OrganizationId,
        terms: SubscriptionTerms,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Subscription> {
        if tx
            .find_subscription_by_organization(organization_id)
            .await?
            .is_some()
        {
            return Err(SubscriptionError::Conflict(
                "Organization already has a subscription".to_string(),
            ));
        }

        let period: ValidityPeriod = terms.validity.parse()?;
        let ended_at = period.add_to(now)?;
        if ended_at <= now {
            return Err(SubscriptionError::Validation(format!(
                "validity {:?} does not end after the start date",
                terms.validity
            )));
        }

        let plan_id = match terms.plan_id {
            Some(plan_id) => {
                let plan = tx
                    .find_plan(plan_id)
                    .await?
                    .ok_or_else(|| SubscriptionError::not_found("Plan does not exist"))?;
                // A custom plan belongs to exactly one subscription.
                if plan.is_custom() && tx.count_subscriptions_referencing(plan.id).await? > 0 {
                    return Err(SubscriptionError::Conflict(
                        "Plan is already used by another organization".to_string(),
                    ));
                }
                plan.id
            }
            None => {
                let plan_terms = PlanTerms {
                    quota: terms.quota(),
                    price: terms.price,
                    currency: terms
                        .currency
                        .clone()
                        .unwrap_or_else(|| self.config.default_currency.clone()),
                }
                .validated()?;
                let plan = tx
                    .create_plan(plan_terms.custom_template(organization_id))
                    .await?;
                debug!(plan_id = %plan.id, "Created custom plan for new subscription");
                plan.id
            }
        };

        let subscription = tx
            .insert_subscription(NewSubscription {
                organization_id,
                plan_id,
                started_at: now,
                ended_at: Some(ended_at),
            })
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => SubscriptionError::Conflict(
                    "Organization already has a subscription".to_string(),
                ),
                other => other.into(),
            })?;
        Ok(subscription)
    }

    /// Apply an administrator's edit to an organization's subscription.
    ///
    /// Renames the organization if needed, resolves the next plan, applies
    /// the status transition and extension, records one history entry and
    /// removes a custom plan the subscription no longer uses. All of it
    /// commits together or not at all.
    #[instrument(
        skip(self, request),
        fields(organization_id = %organization_id, changed_by = %request.changed_by_user_id)
    )]
    pub async fn update_subscription(
        &self,
        organization_id: OrganizationId,
        request: UpdateSubscription,
    ) -> SubscriptionResult<Subscription> {
        let now = self.now();
        let mut tx = self.store.begin().await?;

        match self
            .apply_update(&mut tx, organization_id, request, now)
            .await
        {
            Ok(subscription) => {
                tx.commit().await?;
                info!(
                    subscription_id = %subscription.id,
                    plan_id = %subscription.plan_id,
                    status = %subscription.status,
                    "Updated subscription"
                );
                Ok(subscription)
            }
            Err(e) => {
                error!(error = %e, "Subscription update rolled back");
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback reported a failure");
                }
                Err(e)
            }
        }
    }

    async fn apply_update(
        &self,
        tx: &mut S::Tx,
        organization_id: OrganizationId,
        request: UpdateSubscription,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Subscription> {
        let changed_by = request.changed_by_user_id.trim().to_string();
        if changed_by.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "changed_by_user_id",
            }
            .into());
        }
        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" }.into());
        }

        let mut organization = tx
            .find_organization(organization_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(ORGANIZATION_MISSING))?;
        let previous = tx
            .find_subscription_by_organization(organization_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(SUBSCRIPTION_MISSING))?;
        let previous_plan = tx.find_plan(previous.plan_id).await?;
        let mut subscription = previous.clone();

        if organization.name != display_name {
            organization.name = display_name.to_string();
            tx.update_organization(organization).await?;
        }

        let terms = PlanTerms {
            quota: request.quota,
            price: request.price,
            currency: request
                .currency
                .unwrap_or_else(|| self.config.default_currency.clone()),
        };
        let resolution = resolve_plan(
            &mut *tx,
            organization_id,
            request.plan_id,
            previous.plan_id,
            terms,
        )
        .await?;
        subscription.plan_id = resolution.plan_id();

        subscription.transition_to(request.status, now)?;

        if let Some(phrase) = request
            .extend_duration
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let period: ValidityPeriod = phrase.parse()?;
            subscription.extend(&period, now)?;
        }

        let subscription = tx.update_subscription(subscription).await?;

        tx.append_history(
            NewHistoryEntry::transition(Some(&previous), &subscription, changed_by, now)
                .with_notes(request.notes),
        )
        .await?;

        if let Some(old) = previous_plan.filter(|p| p.is_custom() && p.id != subscription.plan_id) {
            let references = tx.count_subscriptions_referencing(old.id).await?;
            if references == 0 {
                tx.delete_plan(old.id).await?;
                info!(plan_id = %old.id, "Removed unused custom plan");
            } else {
                debug!(
                    plan_id = %old.id,
                    references,
                    "Custom plan still referenced, keeping it"
                );
            }
        }

        Ok(subscription)
    }

    /// The organization's subscription, whatever its status.
    pub async fn get_subscription(
        &self,
        organization_id: OrganizationId,
    ) -> SubscriptionResult<Option<Subscription>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_subscription_by_organization(organization_id).await?)
    }

    /// The organization's subscription if it is active and not yet ended.
    pub async fn get_active_subscription(
        &self,
        organization_id: OrganizationId,
    ) -> SubscriptionResult<Option<Subscription>> {
        let now = self.now();
        let mut tx = self.store.begin().await?;
        Ok(tx.find_active_subscription(organization_id, now).await?)
    }

    /// Audit trail of the organization's subscription, oldest first.
    pub async fn get_subscription_history(
        &self,
        organization_id: OrganizationId,
    ) -> SubscriptionResult<Vec<SubscriptionHistory>> {
        let mut tx = self.store.begin().await?;
        let subscription = tx
            .find_subscription_by_organization(organization_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(SUBSCRIPTION_MISSING))?;
        Ok(tx.find_history(subscription.id).await?)
    }

    /// Organization, subscription and plan in one read.
    pub async fn organization_overview(
        &self,
        organization_id: OrganizationId,
    ) -> SubscriptionResult<OrganizationOverview> {
        let mut tx = self.store.begin().await?;
        let organization = tx
            .find_organization(organization_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(ORGANIZATION_MISSING))?;
        let subscription = tx
            .find_subscription_by_organization(organization_id)
            .await?
            .ok_or_else(|| {
                SubscriptionError::not_found("No active subscription found for this organization")
            })?;
        let plan = tx
            .find_plan(subscription.plan_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(PLAN_MISSING))?;

        Ok(OrganizationOverview {
            organization,
            subscription,
            plan,
        })
    }

    /// Every organization, filtered by a name substring and paged.
    pub async fn list_organizations(
        &self,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> SubscriptionResult<Vec<Organization>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_organizations(search, limit, offset).await?)
    }

    /// Edit the organization's name and contact person.
    #[instrument(skip(self, name, contact), fields(organization_id = %organization_id))]
    pub async fn update_organization_details(
        &self,
        organization_id: OrganizationId,
        name: &str,
        contact: OrganizationContact,
    ) -> SubscriptionResult<Organization> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" }.into());
        }

        let mut tx = self.store.begin().await?;
        let mut organization = tx
            .find_organization(organization_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(ORGANIZATION_MISSING))?;
        organization.name = name.to_string();
        organization.contact = contact;
        let organization = tx.update_organization(organization).await?;
        tx.commit().await?;

        info!("Updated organization details");
        Ok(organization)
    }

    /// Expire every active subscription whose end date lies before `now`.
    ///
    /// Returns how many subscriptions changed. No history is written for
    /// sweep-induced expirations.
    pub async fn sweep_expired_subscriptions(&self, now: DateTime<Utc>) -> SubscriptionResult<u64> {
        let mut tx = self.store.begin().await?;
        let count = tx.sweep_expired(now).await?;
        tx.commit().await?;

        if count > 0 {
            info!(count, "Expired lapsed subscriptions");
        } else {
            debug!("No lapsed subscriptions");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use platform_org::PlanTemplate;
    use platform_store::MemoryStore;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn engine() -> (SubscriptionEngine<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(start());
        let engine = SubscriptionEngine::new(MemoryStore::new()).with_clock(Arc::new(clock.clone()));
        (engine, clock)
    }

    #[test]
    fn test_terms_quota_defaults() {
        let quota = SubscriptionTerms::new("1 month").with_members(8).quota();
        assert_eq!(quota.max_members, 8);
        assert_eq!(quota.max_projects, PlanQuota::default().max_projects);
        assert_eq!(
            quota.private_storage_per_user,
            PlanQuota::default().private_storage_per_user
        );
    }

    #[tokio::test]
    async fn test_create_requires_organization() {
        let (engine, _) = engine();
        let result = engine
            .create_subscription(OrganizationId::generate(), SubscriptionTerms::new("1 year"))
            .await;
        assert_eq!(
            result,
            Err(SubscriptionError::NotFound(ORGANIZATION_MISSING.to_string()))
        );
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_validity() {
        let (engine, _) = engine();
        for validity in ["0 days", "-1 month", "fortnight", ""] {
            let result = engine
                .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new(validity))
                .await;
            assert!(
                matches!(result, Err(SubscriptionError::Validation(_))),
                "{validity:?}"
            );
        }

        // Nothing was left behind by the failed provisioning attempts.
        let mut tx = engine.store().begin().await.unwrap();
        assert_eq!(tx.count_plans().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_with_unknown_plan() {
        let (engine, _) = engine();
        let result = engine
            .provision_organization(
                NewOrganization::new("Acme"),
                SubscriptionTerms::new("1 year").with_plan(PlanId::generate()),
            )
            .await;
        assert!(matches!(result, Err(SubscriptionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_refuses_custom_plan_in_use() {
        let (engine, _) = engine();
        let (_, owner) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
            .await
            .unwrap();

        let result = engine
            .provision_organization(
                NewOrganization::new("Globex"),
                SubscriptionTerms::new("1 year").with_plan(owner.plan_id),
            )
            .await;
        assert_eq!(
            result,
            Err(SubscriptionError::Conflict(
                "Plan is already used by another organization".to_string()
            ))
        );

        let mut tx = engine.store().begin().await.unwrap();
        assert_eq!(tx.count_subscriptions_referencing(owner.plan_id).await.unwrap(), 1);
        assert!(tx.find_organizations("globex", None, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_public_plan_is_shared_freely() {
        let (engine, _) = engine();
        let pro = engine
            .create_plan(PlanTemplate::new("Pro", PlanQuota::default()).public())
            .await
            .unwrap();
        for name in ["Acme", "Globex"] {
            engine
                .provision_organization(
                    NewOrganization::new(name),
                    SubscriptionTerms::new("1 year").with_plan(pro.id),
                )
                .await
                .unwrap();
        }

        let mut tx = engine.store().begin().await.unwrap();
        assert_eq!(tx.count_subscriptions_referencing(pro.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_organizations() {
        let (engine, _) = engine();
        for name in ["Initech", "Acme", "Acme Labs"] {
            engine
                .provision_organization(NewOrganization::new(name), SubscriptionTerms::new("1 year"))
                .await
                .unwrap();
        }

        let names = |orgs: Vec<Organization>| -> Vec<String> {
            orgs.into_iter().map(|o| o.name).collect()
        };
        assert_eq!(
            names(engine.list_organizations("", None, 0).await.unwrap()),
            ["Acme", "Acme Labs", "Initech"]
        );
        assert_eq!(
            names(engine.list_organizations("acme", Some(1), 1).await.unwrap()),
            ["Acme Labs"]
        );
    }

    #[tokio::test]
    async fn test_create_uses_configured_currency() {
        let (engine, _) = engine();
        let engine = engine
            .with_config(EngineConfig {
                default_currency: "chf".to_string(),
                ..EngineConfig::default()
            })
            .unwrap();
        let (org, subscription) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
            .await
            .unwrap();

        let overview = engine.organization_overview(org.id).await.unwrap();
        assert_eq!(overview.plan.id, subscription.plan_id);
        assert_eq!(overview.plan.currency, "CHF");
        assert_eq!(overview.plan.quota, PlanQuota::default());
    }

    #[tokio::test]
    async fn test_extension_is_additive() {
        let (engine, clock) = engine();
        let (org, subscription) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 month"))
            .await
            .unwrap();
        assert_eq!(subscription.ended_at, Some(start() + Duration::days(31)));

        clock.advance(Duration::days(10));
        let overview = engine.organization_overview(org.id).await.unwrap();
        let updated = engine
            .update_subscription(
                org.id,
                UpdateSubscription::from_current(&overview, "admin").with_extension("+3 days"),
            )
            .await
            .unwrap();
        assert_eq!(updated.ended_at, Some(start() + Duration::days(34)));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_actor() {
        let (engine, _) = engine();
        let (org, _) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
            .await
            .unwrap();
        let overview = engine.organization_overview(org.id).await.unwrap();

        let result = engine
            .update_subscription(org.id, UpdateSubscription::from_current(&overview, "  "))
            .await;
        assert!(matches!(result, Err(SubscriptionError::Validation(_))));
    }

    #[tokio::test]
    async fn test_manual_expiry_is_refused() {
        let (engine, _) = engine();
        let (org, _) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
            .await
            .unwrap();
        let overview = engine.organization_overview(org.id).await.unwrap();

        let result = engine
            .update_subscription(
                org.id,
                UpdateSubscription::from_current(&overview, "admin")
                    .with_status(SubscriptionStatus::Expired),
            )
            .await;
        assert!(matches!(result, Err(SubscriptionError::Validation(_))));
        assert!(engine.get_subscription_history(org.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_organization_details() {
        let (engine, _) = engine();
        let (org, _) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
            .await
            .unwrap();

        let contact = OrganizationContact {
            contact_email: Some("billing@acme.test".to_string()),
            ..OrganizationContact::default()
        };
        let updated = engine
            .update_organization_details(org.id, " Acme GmbH ", contact.clone())
            .await
            .unwrap();
        assert_eq!(updated.name, "Acme GmbH");
        assert_eq!(updated.contact, contact);

        let missing = engine
            .update_organization_details(OrganizationId::generate(), "X", contact)
            .await;
        assert!(matches!(missing, Err(SubscriptionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_overview_reports_missing_pieces() {
        let (engine, _) = engine();
        assert_eq!(
            engine.organization_overview(OrganizationId::generate()).await,
            Err(SubscriptionError::NotFound(ORGANIZATION_MISSING.to_string()))
        );

        let mut tx = engine.store().begin().await.unwrap();
        let org = tx.insert_organization(NewOrganization::new("Bare")).await.unwrap();
        tx.commit().await.unwrap();

        let err = engine.organization_overview(org.id).await.unwrap_err();
        assert_eq!(
            err,
            SubscriptionError::NotFound(
                "No active subscription found for this organization".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_active_subscription_follows_clock() {
        let (engine, clock) = engine();
        let (org, _) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("2 days"))
            .await
            .unwrap();

        assert!(engine.get_active_subscription(org.id).await.unwrap().is_some());
        clock.advance(Duration::days(3));
        assert!(engine.get_active_subscription(org.id).await.unwrap().is_none());
        assert!(engine.get_subscription(org.id).await.unwrap().is_some());
    }
}
