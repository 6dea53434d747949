use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier of a submitted space request.
    RequestId
);
identifier!(
    /// Inventory room code, e.g. `B3-204`.
    RoomId
);
identifier!(
    /// Identifier of an allocation ledger entry.
    AllocationId
);
identifier!(
    /// Identifier of a room return request.
    ReturnId
);

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ALLOCATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RETURN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

pub(crate) fn next_allocation_id() -> AllocationId {
    let id = ALLOCATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AllocationId(format!("alloc-{id:06}"))
}

pub(crate) fn next_return_id() -> ReturnId {
    let id = RETURN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReturnId(format!("ret-{id:06}"))
}

/// Moves the generators past identifiers restored from a snapshot.
pub(crate) fn reserve_ids<'a>(
    requests: impl IntoIterator<Item = &'a RequestId>,
    allocations: impl IntoIterator<Item = &'a AllocationId>,
    returns: impl IntoIterator<Item = &'a ReturnId>,
) {
    for id in requests {
        advance_past(&REQUEST_SEQUENCE, id.as_str());
    }
    for id in allocations {
        advance_past(&ALLOCATION_SEQUENCE, id.as_str());
    }
    for id in returns {
        advance_past(&RETURN_SEQUENCE, id.as_str());
    }
}

fn advance_past(sequence: &AtomicU64, id: &str) {
    let suffix = id.rsplit('-').next().unwrap_or_default();
    if let Ok(value) = suffix.parse::<u64>() {
        sequence.fetch_max(value.saturating_add(1), Ordering::Relaxed);
    }
}

/// Holder of a room: a whole department or a named individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignee {
    Department {
        name: String,
    },
    Individual {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        department: Option<String>,
    },
}

impl Assignee {
    pub fn department(name: impl Into<String>) -> Self {
        Self::Department { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Assignee::Department { name } | Assignee::Individual { name, .. } => name,
        }
    }

    /// Department the holder answers to, if known.
    pub fn department_name(&self) -> Option<&str> {
        match self {
            Assignee::Department { name } => Some(name),
            Assignee::Individual { department, .. } => department.as_deref(),
        }
    }

    pub fn is_held_by(&self, department: &str) -> bool {
        self.department_name()
            .map(|name| name.trim().eq_ignore_ascii_case(department.trim()))
            .unwrap_or(false)
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignee::Department { name } => f.write_str(name),
            Assignee::Individual {
                name,
                department: Some(department),
            } => write!(f, "{name} ({department})"),
            Assignee::Individual {
                name,
                department: None,
            } => f.write_str(name),
        }
    }
}

/// Time source for transition stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), super::HousingError> {
    if value.trim().is_empty() {
        Err(super::HousingError::Validation(format!(
            "{field} must not be empty"
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn require_positive_area(value: f64, field: &str) -> Result<(), super::HousingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(super::HousingError::Validation(format!(
            "{field} must be a positive area (found {value})"
        )))
    }
}
