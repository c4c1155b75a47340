//! # Platform Store
//!
//! Transactional persistence for organizations, plans, subscriptions and
//! subscription history on the Relay platform.
//!
//! ## Overview
//!
//! The platform-store crate provides:
//! - **Store traits**: `PlanStore`, `SubscriptionStore`, `HistoryStore` and
//!   `OrganizationStore`, one per table
//! - **Transactions**: every access goes through a [`Transaction`] that
//!   commits atomically or leaves no trace
//! - **Memory backend**: [`MemoryStore`] for single-process apps and tests
//!
//! ## Features
//!
//! - `memory` (default): In-memory store backed by a `tokio` read/write lock
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use platform_org::{NewOrganization, NewSubscription, PlanQuota, PlanTemplate};
//! use platform_store::{
//!     MemoryStore, OrganizationStore, PlanStore, Store, SubscriptionStore, Transaction,
//! };
//!
//! async fn provision() -> platform_store::StoreResult<()> {
//!     let store = MemoryStore::new();
//!
//!     let mut tx = store.begin().await?;
//!     let org = tx.insert_organization(NewOrganization::new("Acme")).await?;
//!     let plan = tx.create_plan(PlanTemplate::new("Team", PlanQuota::default())).await?;
//!     tx.insert_subscription(NewSubscription {
//!         organization_id: org.id,
//!         plan_id: plan.id,
//!         started_at: Utc::now(),
//!         ended_at: Some(Utc::now() + Duration::days(365)),
//!     })
//!     .await?;
//!     tx.commit().await
//! }
//! ```
//!
//! ## Concurrency
//!
//! A transaction of the memory backend holds the store's write lock until it
//! commits or drops. Concurrent writers therefore run one after another, and
//! a reader never observes half of a unit of work.

pub mod error;
pub mod store;

#[cfg(feature = "memory")]
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use store::{HistoryStore, OrganizationStore, PlanStore, Store, SubscriptionStore, Transaction};

#[cfg(feature = "memory")]
pub use memory::{MemoryStore, MemoryTransaction};
