//! Patient and prescription models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A patient record in canonical (normalized) shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Unique identifier, immutable once assigned
    pub id: String,
    pub name: String,
    pub email: String,
    /// Phone number, kept verbatim (never case-folded)
    #[serde(rename = "phno")]
    pub phone: String,
    pub age: String,
    pub address: String,
    pub sex: String,
    /// Medical-concern tags, in the order the server sent them
    pub medical_concern: Vec<String>,
    /// Checkup completed; only ever moves from false to true
    pub is_completed: bool,
    /// Historical prescriptions
    pub prescription: Vec<Prescription>,
    /// Prescriptions added through the dashboard (absent until the server sends the list)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_prescription: Option<Vec<Prescription>>,
    /// Creation timestamp as sent by the server
    pub created_at: String,
}

impl Patient {
    /// Create a patient with only the required fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            phone: String::new(),
            age: String::new(),
            address: String::new(),
            sex: String::new(),
            medical_concern: Vec::new(),
            is_completed: false,
            prescription: Vec::new(),
            new_prescription: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Copy of this patient with the completion flag set.
    pub fn completed(&self) -> Self {
        Self {
            is_completed: true,
            ..self.clone()
        }
    }

    /// Prescriptions held in the given provenance list.
    pub fn prescriptions(&self, list: PrescriptionList) -> &[Prescription] {
        match list {
            PrescriptionList::Historical => &self.prescription,
            PrescriptionList::NewlyAdded => self.new_prescription.as_deref().unwrap_or_default(),
        }
    }

    /// Copy of this patient with one prescription removed from the given list.
    ///
    /// The other list is left untouched even when it holds an entry with the same id.
    pub fn without_prescription(&self, list: PrescriptionList, prescription_id: &str) -> Self {
        let mut updated = self.clone();
        match list {
            PrescriptionList::Historical => {
                updated.prescription.retain(|p| p.id != prescription_id);
            }
            PrescriptionList::NewlyAdded => {
                if let Some(added) = updated.new_prescription.as_mut() {
                    added.retain(|p| p.id != prescription_id);
                }
            }
        }
        updated
    }
}

/// A prescription issued to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prescription {
    pub id: String,
    /// Medication name
    pub tablets: String,
    pub dosage: String,
    pub duration: String,
    /// Issue timestamp
    pub date: String,
}

/// Which of a patient's two prescription lists an entry belongs to.
///
/// The lists are told apart by provenance only; identifiers may repeat across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrescriptionList {
    /// `prescription`: entries the patient arrived with
    Historical,
    /// `newPrescription`: entries added from the dashboard
    NewlyAdded,
}

impl PrescriptionList {
    /// Path segment used by the remote service for this list.
    pub fn path_segment(self) -> &'static str {
        match self {
            PrescriptionList::Historical => "prescription",
            PrescriptionList::NewlyAdded => "newPrescription",
        }
    }
}

/// Prescription form contents before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrescriptionDraft {
    pub tablets: String,
    pub dosage: String,
    pub duration: String,
}

impl PrescriptionDraft {
    pub fn new(
        tablets: impl Into<String>,
        dosage: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            tablets: tablets.into(),
            dosage: dosage.into(),
            duration: duration.into(),
        }
    }

    /// Every field filled in.
    pub fn is_complete(&self) -> bool {
        !self.tablets.is_empty() && !self.dosage.is_empty() && !self.duration.is_empty()
    }

    /// Stamp the draft with an issue date, producing the wire payload.
    pub fn issue(&self, now: DateTime<Utc>) -> NewPrescription {
        NewPrescription {
            tablets: self.tablets.clone(),
            dosage: self.dosage.clone(),
            duration: self.duration.clone(),
            date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Prescription as sent to the server (the server assigns the id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPrescription {
    pub tablets: String,
    pub dosage: String,
    pub duration: String,
    pub date: String,
}
