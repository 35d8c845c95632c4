//! Identifier newtypes shared across the engine
//!
//! Tenants, organizations, runs, and step keys are all opaque strings,
//! but mixing them up is exactly the kind of bug a compliance engine
//! cannot afford, so each gets its own type.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// The tenant a workflow run belongs to. Drives secret resolution
    /// and task-queue isolation.
    TenantId
}

string_id! {
    /// The organization a workflow run acts on behalf of.
    OrgId
}

string_id! {
    /// A single materialized workflow run.
    RunId
}

string_id! {
    /// A step within a run, unique per run.
    StepKey
}

impl RunId {
    /// Generate a fresh opaque run identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
