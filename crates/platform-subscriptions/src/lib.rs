//! # Platform Subscriptions
//!
//! This crate provides the subscription lifecycle engine for the Relay
//! platform's multi-tenant organizations.
//!
//! ## Overview
//!
//! The platform-subscriptions crate handles:
//! - **Lifecycle**: Creating subscriptions, status transitions, validity
//!   extensions and the audit history of every change
//! - **Plan resolution**: Adopting a public plan, editing a custom plan in
//!   place, or forking a new custom plan, and cleaning up the one left behind
//! - **Plan administration**: The public catalogue and custom plans
//! - **Access enforcement**: Whether an organization may use the platform
//! - **Expiry sweep**: Periodic expiry of lapsed subscriptions
//!
//! ## Status Transitions
//!
//! | To | Effect |
//! |---|---|
//! | `paused` | `paused_at = now`, `cancelled_at` cleared |
//! | `cancelled` | `cancelled_at = now`, `paused_at` cleared |
//! | `active` | both timestamps cleared |
//! | `expired` | only through the expiry sweep |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use platform_org::{NewOrganization, SubscriptionStatus};
//! use platform_store::MemoryStore;
//! use platform_subscriptions::{
//!     ExpirySweeper, SubscriptionEngine, SubscriptionGate, SubscriptionTerms, UpdateSubscription,
//! };
//!
//! async fn example() -> platform_subscriptions::SubscriptionResult<()> {
//!     let engine = Arc::new(SubscriptionEngine::new(MemoryStore::new()));
//!     engine.seed_default_plans().await?;
//!
//!     let (org, _) = engine
//!         .provision_organization(NewOrganization::new("Acme"), SubscriptionTerms::new("1 year"))
//!         .await?;
//!
//!     // Pause it
//!     let overview = engine.organization_overview(org.id).await?;
//!     let request = UpdateSubscription::from_current(&overview, "admin-uid")
//!         .with_status(SubscriptionStatus::Paused);
//!     engine.update_subscription(org.id, request).await?;
//!     assert!(!engine.is_subscription_usable(org.id).await?);
//!
//!     // Sweep hourly in the background
//!     let sweeper = ExpirySweeper::new(engine.clone()).spawn();
//!     sweeper.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod plans;
pub mod resolution;
pub mod sweeper;

// Re-export main types for convenience
pub use access::{AccessDecision, SubscriptionGate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::{SubscriptionEngine, SubscriptionTerms, UpdateSubscription};
pub use error::{SubscriptionError, SubscriptionResult};
pub use resolution::{resolve_plan, PlanTerms, Resolution};
pub use sweeper::{ExpirySweeper, SweeperHandle};
