//! # Platform Organization Management
//!
//! This crate provides the multi-tenant organization, plan and subscription
//! data model for the Relay platform.
//!
//! ## Overview
//!
//! The platform-org crate handles:
//! - **Organizations**: Tenant entities with contact details and an administrator
//! - **Plans**: Quota templates, either public (shared catalogue) or custom
//! - **Subscriptions**: One per organization, pointing at the plan in force
//! - **History**: Immutable before/after snapshots of subscription changes
//! - **Validity periods**: Human duration phrases such as `"1 year"`
//!
//! ## Architecture
//!
//! ```text
//! Organization
//!   └─ Subscription (1:1 by organization_id)
//!        ├─ Plan (public: shared; custom: owned by this lineage)
//!        └─ SubscriptionHistory (append-only)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use platform_org::{PlanQuota, PlanTemplate, OrganizationId, ValidityPeriod};
//!
//! let org_id = OrganizationId::generate();
//! let template = PlanTemplate::custom_for(org_id, PlanQuota::default())
//!     .validated()
//!     .unwrap();
//! assert!(!template.is_public);
//!
//! let period: ValidityPeriod = "1 year".parse().unwrap();
//! let now = Utc::now();
//! assert!(period.add_to(now).unwrap() > now);
//! ```
//!
//! The crate is pure data and performs no I/O. Storage lives in
//! `platform-store`; the lifecycle rules in `platform-subscriptions`.
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization support (enabled by default)

pub mod error;
pub mod history;
pub mod ids;
pub mod organization;
pub mod plan;
pub mod subscription;
pub mod validity;

// Re-export main types for convenience
pub use error::{ValidationError, ValidityError};
pub use history::{NewHistoryEntry, SubscriptionHistory};
pub use ids::{HistoryId, OrganizationId, PlanId, SubscriptionId};
pub use organization::{NewOrganization, Organization, OrganizationContact, OrganizationOverview};
pub use plan::{normalize_currency, Plan, PlanQuota, PlanTemplate, DEFAULT_CURRENCY, GIB, MIB};
pub use subscription::{NewSubscription, Subscription, SubscriptionSnapshot, SubscriptionStatus};
pub use validity::ValidityPeriod;
