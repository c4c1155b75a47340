//! Plan resolution
//!
//! Every subscription update names a target plan and a set of raw terms.
//! Resolution decides which plan row the subscription points at next,
//! trying three outcomes in order:
//!
//! 1. the target is an existing public plan: adopt it, ignoring the terms;
//! 2. the current plan is an existing custom plan: rewrite it in place;
//! 3. otherwise: fork a new custom plan for the organization.
//!
//! Removing a custom plan that the update left behind is the caller's job.

use platform_org::{normalize_currency, OrganizationId, PlanId, PlanQuota, PlanTemplate};
use platform_store::PlanStore;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::SubscriptionResult;

/// Quota, price and currency requested for a custom plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTerms {
    /// Resource limits
    pub quota: PlanQuota,

    /// Price per billing period
    pub price: Option<Decimal>,

    /// ISO 4217 currency code
    pub currency: String,
}

impl PlanTerms {
    /// Validate limits and price, normalize the currency.
    pub fn validated(mut self) -> SubscriptionResult<Self> {
        self.quota.validate()?;
        if matches!(self.price, Some(price) if price < Decimal::ZERO) {
            return Err(platform_org::ValidationError::NegativePrice.into());
        }
        self.currency = normalize_currency(&self.currency)?;
        Ok(self)
    }

    /// Template for a fresh custom plan of `organization_id`.
    pub fn custom_template(&self, organization_id: OrganizationId) -> PlanTemplate {
        PlanTemplate::custom_for(organization_id, self.quota)
            .with_price(self.price)
            .with_currency(self.currency.clone())
    }
}

/// Which of the three outcomes resolution picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The requested public plan was adopted unchanged
    AdoptedPublic(PlanId),
    /// The current custom plan was rewritten in place
    MutatedCustom(PlanId),
    /// A new custom plan was created
    ForkedCustom(PlanId),
}

impl Resolution {
    /// The plan the subscription should point at.
    pub fn plan_id(&self) -> PlanId {
        match self {
            Resolution::AdoptedPublic(id)
            | Resolution::MutatedCustom(id)
            | Resolution::ForkedCustom(id) => *id,
        }
    }
}

/// Resolve the next plan of a subscription inside an open transaction.
///
/// `requested` is the plan the caller asked for, `current` the plan the
/// subscription points at now. Terms are validated only when a custom plan
/// is written.
pub async fn resolve_plan<T>(
    tx: &mut T,
    organization_id: OrganizationId,
    requested: Option<PlanId>,
    current: PlanId,
    terms: PlanTerms,
) -> SubscriptionResult<Resolution>
where
    T: PlanStore + ?Sized,
{
    if let Some(requested) = requested {
        if let Some(plan) = tx.find_plan(requested).await? {
            if plan.is_public {
                debug!(plan_id = %plan.id, "Adopting public plan");
                return Ok(Resolution::AdoptedPublic(plan.id));
            }
        }
    }

    if let Some(mut plan) = tx.find_plan(current).await? {
        if plan.is_custom() {
            let terms = terms.validated()?;
            plan.apply_terms(terms.quota, terms.price, terms.currency);
            let plan = tx.update_plan(plan).await?;
            debug!(plan_id = %plan.id, "Updated custom plan in place");
            return Ok(Resolution::MutatedCustom(plan.id));
        }
    }

    let terms = terms.validated()?;
    let plan = tx.create_plan(terms.custom_template(organization_id)).await?;
    info!(
        organization_id = %organization_id,
        plan_id = %plan.id,
        "Created custom plan"
    );
    Ok(Resolution::ForkedCustom(plan.id))
}
