//! Filter/search projection of the patient store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::Patient;

/// Dashboard category tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    All,
    Completed,
    Pending,
}

impl Tab {
    pub fn admits(self, patient: &Patient) -> bool {
        match self {
            Tab::All => true,
            Tab::Completed => patient.is_completed,
            Tab::Pending => !patient.is_completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::All => "all",
            Tab::Completed => "completed",
            Tab::Pending => "pending",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Tab::All),
            "completed" => Ok(Tab::Completed),
            "pending" => Ok(Tab::Pending),
            other => Err(format!("unknown tab: {}", other)),
        }
    }
}

/// Search term plus active tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub search: String,
    pub tab: Tab,
}

impl ViewFilter {
    pub fn new(search: impl Into<String>, tab: Tab) -> Self {
        Self {
            search: search.into(),
            tab,
        }
    }

    /// Name and email match case-insensitively; phone matches verbatim.
    pub fn matches_search(&self, patient: &Patient) -> bool {
        let term = self.search.to_lowercase();
        patient.name.to_lowercase().contains(&term)
            || patient.email.to_lowercase().contains(&term)
            || patient.phone.contains(&self.search)
    }

    pub fn admits(&self, patient: &Patient) -> bool {
        self.tab.admits(patient) && self.matches_search(patient)
    }
}

/// Records passing the filter, in collection order.
///
/// Always computed from scratch; nothing is cached between calls.
pub fn project(patients: &[Arc<Patient>], filter: &ViewFilter) -> Vec<Arc<Patient>> {
    patients
        .iter()
        .filter(|p| filter.admits(p))
        .cloned()
        .collect()
}
