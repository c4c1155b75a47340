//! Strongly-typed identifiers.
//!
//! Every table gets its own id type so a plan id can never be passed where a
//! subscription id is expected. Ids are UUID v7 values assigned by the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh, time-ordered identifier.
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }

            /// The wrapped UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Organization (tenant) identifier.
    OrganizationId
);

entity_id!(
    /// Plan identifier.
    PlanId
);

entity_id!(
    /// Subscription identifier.
    SubscriptionId
);

entity_id!(
    /// Subscription history entry identifier.
    HistoryId
);
