//! Plan administration
//!
//! Catalogue management for administrators: listing, creating, editing and
//! deleting plans, plus seeding the default public catalogue.

use platform_org::{Plan, PlanId, PlanTemplate};
use platform_store::{PlanStore, Store, Transaction};
use tracing::{info, instrument};

use crate::engine::SubscriptionEngine;
use crate::error::{SubscriptionError, SubscriptionResult};

const PLAN_DOES_NOT_EXIST: &str = "Plan does not exist";

impl<S: Store> SubscriptionEngine<S> {
    /// Get a plan by id.
    pub async fn get_plan(&self, id: PlanId) -> SubscriptionResult<Option<Plan>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.find_plan(id).await?)
    }

    /// The public catalogue, ordered by name.
    pub async fn list_public_plans(&self) -> SubscriptionResult<Vec<Plan>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.find_public_plans().await?)
    }

    /// Every plan, public and custom, filtered by a name substring.
    pub async fn list_plans_admin(
        &self,
        search: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> SubscriptionResult<Vec<Plan>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.find_plans_admin(search, limit, offset).await?)
    }

    /// Create a plan from a template.
    #[instrument(skip(self, template), fields(name = %template.name))]
    pub async fn create_plan(&self, template: PlanTemplate) -> SubscriptionResult<Plan> {
        let template = template.validated()?;
        let mut tx = self.store().begin().await?;
        let plan = tx.create_plan(template).await?;
        tx.commit().await?;

        info!(plan_id = %plan.id, is_public = plan.is_public, "Created plan");
        Ok(plan)
    }

    /// Replace a plan's editable fields.
    ///
    /// A public plan shared by several subscriptions cannot be turned into
    /// a custom one.
    #[instrument(skip(self, template), fields(plan_id = %id))]
    pub async fn update_plan(&self, id: PlanId, template: PlanTemplate) -> SubscriptionResult<Plan> {
        let template = template.validated()?;
        let mut tx = self.store().begin().await?;
        let mut plan = tx
            .find_plan(id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(PLAN_DOES_NOT_EXIST))?;

        if plan.is_public && !template.is_public {
            let references = tx.count_subscriptions_referencing(id).await?;
            if references > 1 {
                return Err(SubscriptionError::Conflict(format!(
                    "Cannot make plan private: it is used by {} subscriptions",
                    references
                )));
            }
        }

        plan.replace_with(template);
        let plan = tx.update_plan(plan).await?;
        tx.commit().await?;

        info!("Updated plan");
        Ok(plan)
    }

    /// Delete a plan no subscription references.
    #[instrument(skip(self), fields(plan_id = %id))]
    pub async fn delete_plan(&self, id: PlanId) -> SubscriptionResult<()> {
        let mut tx = self.store().begin().await?;
        if tx.find_plan(id).await?.is_none() {
            return Err(SubscriptionError::not_found(PLAN_DOES_NOT_EXIST));
        }

        let references = tx.count_subscriptions_referencing(id).await?;
        if references > 0 {
            return Err(SubscriptionError::Conflict(format!(
                "Cannot delete plan: it is used by {} subscriptions",
                references
            )));
        }

        tx.delete_plan(id).await?;
        tx.commit().await?;

        info!("Deleted plan");
        Ok(())
    }

    /// Insert the default public catalogue if no plan exists yet.
    ///
    /// Returns the number of plans inserted.
    pub async fn seed_default_plans(&self) -> SubscriptionResult<u64> {
        let mut tx = self.store().begin().await?;
        if tx.count_plans().await? > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for template in PlanTemplate::default_catalog() {
            tx.create_plan(template.validated()?).await?;
            inserted += 1;
        }
        tx.commit().await?;

        info!(count = inserted, "Seeded default plans");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use crate::{SubscriptionEngine, SubscriptionError, SubscriptionTerms};
    use platform_org::{NewOrganization, PlanQuota, PlanTemplate};
    use platform_store::MemoryStore;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_seed_runs_once() {
        let engine = SubscriptionEngine::new(MemoryStore::new());
        assert_eq!(engine.seed_default_plans().await.unwrap(), 3);
        assert_eq!(engine.seed_default_plans().await.unwrap(), 0);

        let names: Vec<_> = engine
            .list_public_plans()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Free", "Gold", "Pro"]);
    }

    #[tokio::test]
    async fn test_create_plan_validates() {
        let engine = SubscriptionEngine::new(MemoryStore::new());
        let plan = engine
            .create_plan(
                PlanTemplate::new("Team", PlanQuota::default())
                    .with_currency("gbp")
                    .with_price(Some(Decimal::new(1999, 2))),
            )
            .await
            .unwrap();
        assert_eq!(plan.currency, "GBP");
        assert_eq!(engine.get_plan(plan.id).await.unwrap(), Some(plan));

        let negative = engine
            .create_plan(
                PlanTemplate::new("Bad", PlanQuota::default()).with_price(Some(Decimal::from(-5))),
            )
            .await;
        assert!(matches!(negative, Err(SubscriptionError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_plan_in_use() {
        let engine = SubscriptionEngine::new(MemoryStore::new());
        engine.seed_default_plans().await.unwrap();
        let pro = engine
            .list_public_plans()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == "Pro")
            .unwrap();

        for name in ["A", "B"] {
            engine
                .provision_organization(
                    NewOrganization::new(name),
                    SubscriptionTerms::new("1 year").with_plan(pro.id),
                )
                .await
                .unwrap();
        }

        let err = engine.delete_plan(pro.id).await.unwrap_err();
        assert_eq!(
            err,
            SubscriptionError::Conflict("Cannot delete plan: it is used by 2 subscriptions".into())
        );
        assert_eq!(err.status_code(), 409);
        assert!(engine.get_plan(pro.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unused_and_missing_plan() {
        let engine = SubscriptionEngine::new(MemoryStore::new());
        let plan = engine
            .create_plan(PlanTemplate::new("Temp", PlanQuota::default()))
            .await
            .unwrap();

        engine.delete_plan(plan.id).await.unwrap();
        assert!(engine.get_plan(plan.id).await.unwrap().is_none());
        assert!(matches!(
            engine.delete_plan(plan.id).await,
            Err(SubscriptionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_shared_public_plan_cannot_become_private() {
        let engine = SubscriptionEngine::new(MemoryStore::new());
        let shared = engine
            .create_plan(PlanTemplate::new("Shared", PlanQuota::default()).public())
            .await
            .unwrap();
        for name in ["A", "B"] {
            engine
                .provision_organization(
                    NewOrganization::new(name),
                    SubscriptionTerms::new("1 year").with_plan(shared.id),
                )
                .await
                .unwrap();
        }

        let private = PlanTemplate::new("Shared", PlanQuota::default());
        assert!(matches!(
            engine.update_plan(shared.id, private).await,
            Err(SubscriptionError::Conflict(_))
        ));

        let renamed = PlanTemplate::new("Shared Plus", PlanQuota::default()).public();
        let updated = engine.update_plan(shared.id, renamed).await.unwrap();
        assert_eq!(updated.name, "Shared Plus");
        assert!(updated.is_public);
    }

    #[tokio::test]
    async fn test_admin_listing_includes_custom_plans() {
        let engine = SubscriptionEngine::new(MemoryStore::new());
        engine.seed_default_plans().await.unwrap();
        let (org, _) = engine
            .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
            .await
            .unwrap();

        assert_eq!(engine.list_public_plans().await.unwrap().len(), 3);
        assert_eq!(engine.list_plans_admin("", None, 0).await.unwrap().len(), 4);

        let custom = engine
            .list_plans_admin(&org.id.to_string(), Some(10), 0)
            .await
            .unwrap();
        assert_eq!(custom.len(), 1);
        assert!(custom[0].is_custom());
    }
}
