//! Plans and quota templates
//!
//! A plan is a named quota template. Public plans form the shared catalogue
//! every organization can pick from; custom (non-public) plans carry one
//! organization's negotiated terms and belong to exactly one subscription
//! lineage at a time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{OrganizationId, PlanId};

/// One mebibyte in bytes.
pub const MIB: u64 = 1024 * 1024;

/// One gibibyte in bytes.
pub const GIB: u64 = 1024 * MIB;

/// Currency used when none is given.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Resource limits granted by a plan.
///
/// # Examples
///
/// ```
/// use platform_org::PlanQuota;
///
/// let quota = PlanQuota::default();
/// assert_eq!(quota.max_members, 5);
/// assert_eq!(quota.max_projects, 1);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanQuota {
    /// Maximum number of organization members
    pub max_members: u32,

    /// Maximum number of projects
    pub max_projects: u32,

    /// Shared storage per project, in bytes
    pub shared_storage_per_project: u64,

    /// Private storage per user, in bytes
    pub private_storage_per_user: u64,
}

impl Default for PlanQuota {
    fn default() -> Self {
        Self {
            max_members: 5,
            max_projects: 1,
            shared_storage_per_project: 5 * GIB,
            private_storage_per_user: GIB,
        }
    }
}

impl PlanQuota {
    /// Check that member and project limits are positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_members == 0 {
            return Err(ValidationError::NonPositiveLimit {
                field: "max_members",
            });
        }
        if self.max_projects == 0 {
            return Err(ValidationError::NonPositiveLimit {
                field: "max_projects",
            });
        }
        Ok(())
    }
}

/// Normalize a currency code to upper case, rejecting anything that is not
/// three ASCII letters.
///
/// # Examples
///
/// ```
/// use platform_org::normalize_currency;
///
/// assert_eq!(normalize_currency("usd").unwrap(), "USD");
/// assert!(normalize_currency("EURO").is_err());
/// ```
pub fn normalize_currency(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ValidationError::InvalidCurrency(code.to_string()))
    }
}

/// Everything needed to create a plan except its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanTemplate {
    /// Display name
    pub name: String,

    /// Resource limits
    #[serde(flatten)]
    pub quota: PlanQuota,

    /// Price per billing period, if priced
    pub price: Option<Decimal>,

    /// ISO 4217 currency code
    pub currency: String,

    /// Whether the plan is part of the shared catalogue
    pub is_public: bool,
}

impl PlanTemplate {
    /// Creates a private, unpriced template in the default currency.
    pub fn new(name: impl Into<String>, quota: PlanQuota) -> Self {
        Self {
            name: name.into(),
            quota,
            price: None,
            currency: DEFAULT_CURRENCY.to_string(),
            is_public: false,
        }
    }

    /// Creates the custom plan template for one organization.
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_org::{OrganizationId, PlanQuota, PlanTemplate};
    ///
    /// let org_id = OrganizationId::generate();
    /// let template = PlanTemplate::custom_for(org_id, PlanQuota::default());
    /// assert_eq!(template.name, format!("Custom Plan for Org {}", org_id));
    /// assert!(!template.is_public);
    /// ```
    pub fn custom_for(organization_id: OrganizationId, quota: PlanQuota) -> Self {
        Self::new(format!("Custom Plan for Org {}", organization_id), quota)
    }

    /// Set the price.
    pub fn with_price(mut self, price: Option<Decimal>) -> Self {
        self.price = price;
        self
    }

    /// Set the currency code.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Mark the template as part of the public catalogue.
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Validate the template and normalize its currency code.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        self.quota.validate()?;
        if matches!(self.price, Some(price) if price < Decimal::ZERO) {
            return Err(ValidationError::NegativePrice);
        }
        self.currency = normalize_currency(&self.currency)?;
        Ok(self)
    }

    /// The public catalogue seeded into an empty plans table.
    pub fn default_catalog() -> Vec<PlanTemplate> {
        vec![
            PlanTemplate::new(
                "Free",
                PlanQuota {
                    max_members: 1,
                    max_projects: 1,
                    shared_storage_per_project: 50 * MIB,
                    private_storage_per_user: GIB,
                },
            )
            .with_price(Some(Decimal::ZERO))
            .public(),
            PlanTemplate::new(
                "Pro",
                PlanQuota {
                    max_members: 5,
                    max_projects: 2,
                    shared_storage_per_project: 100 * MIB,
                    private_storage_per_user: 5 * GIB,
                },
            )
            .with_price(Some(Decimal::from(10)))
            .public(),
            PlanTemplate::new(
                "Gold",
                PlanQuota {
                    max_members: 20,
                    max_projects: 5,
                    shared_storage_per_project: GIB,
                    private_storage_per_user: 20 * GIB,
                },
            )
            .with_price(Some(Decimal::from(25)))
            .public(),
        ]
    }
}

/// A stored plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Unique identifier
    pub id: PlanId,

    /// Display name
    pub name: String,

    /// Resource limits
    #[serde(flatten)]
    pub quota: PlanQuota,

    /// Price per billing period, if priced
    pub price: Option<Decimal>,

    /// ISO 4217 currency code
    pub currency: String,

    /// Whether the plan is part of the shared catalogue
    pub is_public: bool,
}

impl Plan {
    /// Materialize a template under the given id.
    pub fn from_template(id: PlanId, template: PlanTemplate) -> Self {
        Self {
            id,
            name: template.name,
            quota: template.quota,
            price: template.price,
            currency: template.currency,
            is_public: template.is_public,
        }
    }

    /// Whether this is a custom (non-public) plan.
    pub fn is_custom(&self) -> bool {
        !self.is_public
    }

    /// Overwrite limits, price and currency, keeping id, name and visibility.
    pub fn apply_terms(&mut self, quota: PlanQuota, price: Option<Decimal>, currency: String) {
        self.quota = quota;
        self.price = price;
        self.currency = currency;
    }

    /// Replace every editable field with the template's values.
    pub fn replace_with(&mut self, template: PlanTemplate) {
        self.name = template.name;
        self.quota = template.quota;
        self.price = template.price;
        self.currency = template.currency;
        self.is_public = template.is_public;
    }
}
