//! In-memory patient store.
//!
//! Mirrors the remote service: loaded wholesale, then patched one record at a
//! time as mutations are confirmed. Records are immutable once stored; every
//! change swaps in a new `Arc<Patient>`, so views handed out earlier keep the
//! value they were built from.

mod view;

pub use view::*;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::models::Patient;

/// Store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Identifier mismatch: expected {expected}, found {found}")]
    IdentifierMismatch { expected: String, found: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Canonical patient collection plus the current selection.
///
/// The selection is held by identifier, so it always resolves to the latest
/// stored value of that patient. A selection is the open detail view.
#[derive(Debug, Default, Clone)]
pub struct PatientStore {
    patients: Vec<Arc<Patient>>,
    selected: Option<String>,
}

impl PatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection.
    ///
    /// Duplicate identifiers keep their first occurrence. The selection survives
    /// if its patient is still present.
    pub fn load_all(&mut self, records: Vec<Patient>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut patients = Vec::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.id.clone()) {
                tracing::warn!(patient_id = %record.id, "duplicate patient id in listing, keeping first");
                continue;
            }
            patients.push(Arc::new(record));
        }

        self.patients = patients;

        if let Some(selected) = &self.selected {
            if !seen.contains(selected) {
                self.selected = None;
            }
        }
    }

    /// Replace the record with the given identifier.
    ///
    /// An unknown identifier leaves the store untouched and reports `NotFound`.
    pub fn replace_one(&mut self, id: &str, updated: Patient) -> StoreResult<()> {
        if updated.id != id {
            return Err(StoreError::IdentifierMismatch {
                expected: id.to_string(),
                found: updated.id,
            });
        }

        let slot = self
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = Arc::new(updated);
        Ok(())
    }

    /// Remove the record with the given identifier, closing it if selected.
    pub fn remove_one(&mut self, id: &str) -> Option<Arc<Patient>> {
        let index = self.patients.iter().position(|p| p.id == id)?;
        let removed = self.patients.remove(index);

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }

        Some(removed)
    }

    /// Set the completion flag. Completed patients stay completed.
    pub fn mark_complete(&mut self, id: &str) -> StoreResult<()> {
        let slot = self
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !slot.is_completed {
            *slot = Arc::new(slot.completed());
        }
        Ok(())
    }

    /// Open a patient's detail view.
    pub fn select(&mut self, id: &str) -> StoreResult<Arc<Patient>> {
        let patient = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.selected = Some(id.to_string());
        Ok(patient)
    }

    /// Close the detail view.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// The currently selected patient, at its latest stored value.
    pub fn selected(&self) -> Option<Arc<Patient>> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Patient>> {
        self.patients.iter().find(|p| p.id == id).cloned()
    }

    pub fn patients(&self) -> &[Arc<Patient>] {
        &self.patients
    }

    /// Derived view over the current collection.
    pub fn view(&self, filter: &ViewFilter) -> Vec<Arc<Patient>> {
        project(&self.patients, filter)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn completed_checkups(&self) -> usize {
        self.patients.iter().filter(|p| p.is_completed).count()
    }
}
