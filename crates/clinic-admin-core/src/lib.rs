//! Clinic Admin Core Library
//!
//! Client-side state synchronization for the clinic's admin dashboard. The
//! backend owns every record; this crate keeps an in-memory mirror of the
//! patient collection consistent with it.
//!
//! # Architecture
//!
//! ```text
//!   Remote Patient Service (HTTP)
//!              │
//!              ▼
//!       Record Normalizer          id / _id, missing sub-collections
//!              │
//!              ▼
//!        Patient Store  ◄──────────── Dashboard (mutation orchestrator)
//!              │                        │   validate → remote call →
//!              ▼                        │   store update → notification
//!        Derived View                   │
//!   (search term × active tab)          ▼
//!              │              Notification Channel (single slot, 3s)
//!              ▼
//!            render
//! ```
//!
//! # Core Principle
//!
//! **Confirm, then apply.** The store changes only after the remote call for a
//! mutation has succeeded. Nothing is applied optimistically and nothing is retried.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Prescription, Review, ...)
//! - [`normalizer`]: Server record shapes → canonical records
//! - [`store`]: Patient store and the filter/search projection
//! - [`notify`]: Transient notification channel
//! - [`api`]: Remote service trait, HTTP client and in-memory mock
//! - [`dashboard`]: Mutation orchestrator
//! - [`stats`]: Stat cards and monthly chart data
//! - [`config`]: Client configuration

pub mod api;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod normalizer;
pub mod notify;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use api::{ApiError, HttpPatientService, MockPatientService, PatientService};
pub use config::ClientConfig;
pub use dashboard::{Dashboard, DashboardError, DashboardResult};
pub use models::{
    NewPrescription, NewReview, Patient, Prescription, PrescriptionDraft, PrescriptionList,
    Review, ReviewTally,
};
pub use normalizer::{normalize_patient, normalize_prescription, RawPatient, RawPrescription};
pub use notify::{Notification, NotificationChannel, NotificationKind};
pub use stats::{DashboardStats, MonthlyData};
pub use store::{PatientStore, StoreError, Tab, ViewFilter};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicAdminError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<ApiError> for ClinicAdminError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound(id) => ClinicAdminError::NotFound(id),
            ApiError::Json(e) => ClinicAdminError::SerializationError(e.to_string()),
            other => ClinicAdminError::Remote(other.to_string()),
        }
    }
}

impl From<DashboardError> for ClinicAdminError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::Validation(message) => ClinicAdminError::InvalidInput(message),
            DashboardError::Api(e) => e.into(),
            DashboardError::Normalize(e) => ClinicAdminError::SerializationError(e.to_string()),
        }
    }
}

impl From<StoreError> for ClinicAdminError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ClinicAdminError::NotFound(id),
            other => ClinicAdminError::InvalidInput(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for ClinicAdminError {
    fn from(e: config::ConfigError) -> Self {
        ClinicAdminError::InvalidInput(e.to_string())
    }
}

impl From<std::io::Error> for ClinicAdminError {
    fn from(e: std::io::Error) -> Self {
        ClinicAdminError::RuntimeError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a dashboard against the backend at `base_url`.
#[uniffi::export]
pub fn open_dashboard(base_url: String) -> Result<Arc<ClinicAdminCore>, ClinicAdminError> {
    let config = ClientConfig::new(&base_url)?;
    ClinicAdminCore::with_config(config).map(Arc::new)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe dashboard wrapper for FFI.
///
/// Calls block the calling thread until the remote call resolves; hosts call in
/// from a background thread.
#[derive(uniffi::Object)]
pub struct ClinicAdminCore {
    runtime: tokio::runtime::Runtime,
    dashboard: Dashboard<HttpPatientService>,
}

impl ClinicAdminCore {
    pub fn with_config(config: ClientConfig) -> Result<Self, ClinicAdminError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let ttl = config.notification_ttl();
        let service = HttpPatientService::new(config)?;

        Ok(Self {
            runtime,
            dashboard: Dashboard::with_notification_ttl(service, ttl),
        })
    }
}

#[uniffi::export]
impl ClinicAdminCore {
    // =========================================================================
    // Loading
    // =========================================================================

    /// Reload patients and reviews.
    pub fn refresh(&self) -> Result<(), ClinicAdminError> {
        self.runtime.block_on(async {
            self.dashboard.refresh_patients().await?;
            // The review tally falls back to zero on failure; patients are what matter here
            let _ = self.dashboard.refresh_reviews().await;
            Ok::<(), ClinicAdminError>(())
        })
    }

    // =========================================================================
    // View Operations
    // =========================================================================

    pub fn set_search(&self, term: String) {
        self.dashboard.set_search(term);
    }

    /// Switch tab: "all", "completed" or "pending".
    pub fn set_tab(&self, tab: String) -> Result<(), ClinicAdminError> {
        let tab = tab.parse::<Tab>().map_err(ClinicAdminError::InvalidInput)?;
        self.dashboard.set_tab(tab);
        Ok(())
    }

    pub fn visible_patients(&self) -> Vec<FfiPatient> {
        self.dashboard
            .visible_patients()
            .iter()
            .map(|p| FfiPatient::from(p.as_ref()))
            .collect()
    }

    pub fn select_patient(&self, patient_id: String) -> Result<FfiPatient, ClinicAdminError> {
        let patient = self.dashboard.select_patient(&patient_id)?;
        Ok(FfiPatient::from(patient.as_ref()))
    }

    pub fn selected_patient(&self) -> Option<FfiPatient> {
        self.dashboard
            .selected_patient()
            .map(|p| FfiPatient::from(p.as_ref()))
    }

    pub fn close_patient(&self) {
        self.dashboard.close_patient();
    }

    pub fn stats(&self) -> FfiStats {
        self.dashboard.stats().into()
    }

    pub fn current_notification(&self) -> Option<FfiNotification> {
        self.dashboard.notification().map(Into::into)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn mark_complete(&self, patient_id: String) -> Result<(), ClinicAdminError> {
        Ok(self
            .runtime
            .block_on(self.dashboard.mark_complete(&patient_id))?)
    }

    /// Add a prescription to the selected patient.
    pub fn add_prescription(
        &self,
        tablets: String,
        dosage: String,
        duration: String,
    ) -> Result<(), ClinicAdminError> {
        let draft = PrescriptionDraft::new(tablets, dosage, duration);
        Ok(self.runtime.block_on(self.dashboard.add_prescription(&draft))?)
    }

    /// Delete a prescription; `newly_added` picks the `newPrescription` list.
    pub fn delete_prescription(
        &self,
        patient_id: String,
        prescription_id: String,
        newly_added: bool,
    ) -> Result<(), ClinicAdminError> {
        let list = if newly_added {
            PrescriptionList::NewlyAdded
        } else {
            PrescriptionList::Historical
        };
        Ok(self.runtime.block_on(self.dashboard.delete_prescription(
            &patient_id,
            list,
            &prescription_id,
        ))?)
    }

    pub fn delete_patient(&self, patient_id: String) -> Result<(), ClinicAdminError> {
        Ok(self
            .runtime
            .block_on(self.dashboard.delete_patient(&patient_id))?)
    }

    pub fn send_email(&self, patient_id: String) -> Result<(), ClinicAdminError> {
        Ok(self.runtime.block_on(self.dashboard.send_email(&patient_id))?)
    }

    /// Save the spreadsheet export; returns the number of bytes written.
    pub fn download_export(&self, path: String) -> Result<u64, ClinicAdminError> {
        let dest = PathBuf::from(path);
        Ok(self.runtime.block_on(self.dashboard.download_export(&dest))?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe prescription.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub id: String,
    pub tablets: String,
    pub dosage: String,
    pub duration: String,
    pub date: String,
}

impl From<&Prescription> for FfiPrescription {
    fn from(p: &Prescription) -> Self {
        Self {
            id: p.id.clone(),
            tablets: p.tablets.clone(),
            dosage: p.dosage.clone(),
            duration: p.duration.clone(),
            date: p.date.clone(),
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: String,
    pub address: String,
    pub sex: String,
    pub medical_concern: Vec<String>,
    pub is_completed: bool,
    pub prescriptions: Vec<FfiPrescription>,
    pub new_prescriptions: Option<Vec<FfiPrescription>>,
    pub created_at: String,
}

impl From<&Patient> for FfiPatient {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            age: p.age.clone(),
            address: p.address.clone(),
            sex: p.sex.clone(),
            medical_concern: p.medical_concern.clone(),
            is_completed: p.is_completed,
            prescriptions: p.prescription.iter().map(Into::into).collect(),
            new_prescriptions: p
                .new_prescription
                .as_ref()
                .map(|list| list.iter().map(Into::into).collect()),
            created_at: p.created_at.clone(),
        }
    }
}

/// FFI-safe notification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotification {
    pub success: bool,
    pub head: String,
    pub message: String,
}

impl From<Notification> for FfiNotification {
    fn from(n: Notification) -> Self {
        Self {
            success: n.is_success(),
            head: n.head,
            message: n.message,
        }
    }
}

/// FFI-safe stat card figures.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStats {
    pub total_patients: u32,
    pub completed_checkups: u32,
    pub good_reviews: u32,
    pub bad_reviews: u32,
}

impl From<DashboardStats> for FfiStats {
    fn from(stats: DashboardStats) -> Self {
        Self {
            total_patients: stats.total_patients,
            completed_checkups: stats.completed_checkups,
            good_reviews: stats.good_reviews,
            bad_reviews: stats.bad_reviews,
        }
    }
}
