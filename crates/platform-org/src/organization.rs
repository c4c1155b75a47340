//! Organization domain models
//!
//! This module provides the Organization entity for multi-tenant
//! organization management. Organizations are the tenants that own exactly
//! one subscription; membership and user accounts live in the host
//! platform's user directory.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::OrganizationId;
use crate::plan::Plan;
use crate::subscription::Subscription;

/// Contact person details for an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationContact {
    /// First name of the contact person
    pub contact_first_name: Option<String>,

    /// Last name of the contact person
    pub contact_last_name: Option<String>,

    /// Email address of the contact person
    pub contact_email: Option<String>,

    /// Phone number of the contact person
    pub contact_phone: Option<String>,
}

/// Fields needed to insert an organization; the store assigns the id.
///
/// # Examples
///
/// ```
/// use platform_org::NewOrganization;
///
/// let org = NewOrganization::new("Acme Corp").with_admin("acme-admin");
/// assert_eq!(org.name, "Acme Corp");
/// assert_eq!(org.admin_uid.as_deref(), Some("acme-admin"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    /// Display name
    pub name: String,

    /// Contact person
    pub contact: OrganizationContact,

    /// User id of the designated organization administrator
    pub admin_uid: Option<String>,
}

impl NewOrganization {
    /// Creates an organization draft with no contact details.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: OrganizationContact::default(),
            admin_uid: None,
        }
    }

    /// Set the contact person.
    pub fn with_contact(mut self, contact: OrganizationContact) -> Self {
        self.contact = contact;
        self
    }

    /// Set the administrator user id.
    pub fn with_admin(mut self, admin_uid: impl Into<String>) -> Self {
        self.admin_uid = Some(admin_uid.into());
        self
    }

    /// Trim the name and refuse a blank one.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        self.admin_uid = self
            .admin_uid
            .map(|uid| uid.trim().to_string())
            .filter(|uid| !uid.is_empty());
        Ok(self)
    }
}

/// An organization represents a tenant in the multi-tenant system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: OrganizationId,

    /// Human-readable name
    pub name: String,

    /// Contact person
    #[serde(flatten)]
    pub contact: OrganizationContact,

    /// User id of the designated organization administrator
    pub admin_uid: Option<String>,
}

impl Organization {
    /// Materialize a draft under the given id.
    pub fn from_new(id: OrganizationId, new: NewOrganization) -> Self {
        Self {
            id,
            name: new.name,
            contact: new.contact,
            admin_uid: new.admin_uid,
        }
    }

    /// Check whether `uid` is the organization's administrator.
    pub fn is_admin(&self, uid: &str) -> bool {
        self.admin_uid.as_deref() == Some(uid)
    }
}

/// An organization together with its subscription and the plan in force.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationOverview {
    /// The organization
    pub organization: Organization,

    /// Its subscription
    pub subscription: Subscription,

    /// The plan the subscription points at
    pub plan: Plan,
}
