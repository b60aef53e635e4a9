//! # Account Roles
//!
//! Roles are ordered by privilege so access checks are a single comparison:
//! `Staff < TrainingLead < HrManager < Manager < Admin`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Roles an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reads and acknowledges SOPs.
    Staff,
    /// Oversees training; may view compliance.
    TrainingLead,
    /// HR oversight; may view compliance.
    HrManager,
    /// Operational manager; may view compliance.
    Manager,
    /// Full access, including all `/admin` routes.
    Admin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub fn all() -> &'static [Role] {
        &[
            Self::Staff,
            Self::TrainingLead,
            Self::HrManager,
            Self::Manager,
            Self::Admin,
        ]
    }

    /// Stored and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::TrainingLead => "training_lead",
            Self::HrManager => "hr_manager",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Label shown in the admin UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Staff => "Staff",
            Self::TrainingLead => "Training lead",
            Self::HrManager => "HR manager",
            Self::Manager => "Manager",
            Self::Admin => "Administrator",
        }
    }

    /// Whether this role may open the compliance dashboard and its exports.
    pub fn can_view_compliance(&self) -> bool {
        *self >= Self::TrainingLead
    }

    /// Whether this role may reach `/admin` routes.
    pub fn is_admin(&self) -> bool {
        *self == Self::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(Self::Staff),
            "training_lead" => Ok(Self::TrainingLead),
            "hr_manager" => Ok(Self::HrManager),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}
