//! Remote patient service.
//!
//! The backend owns persistence, email delivery and the spreadsheet export.
//! Endpoints (relative to the configured base URL):
//!
//! ```text
//! GET    /reviews                                   list reviews
//! POST   /reviews                                   submit a review
//! GET    /userDetails                               list patients
//! GET    /userDetails/{id}                          one patient
//! PUT    /userDetails/{id}/complete                 {isCompleted: true}
//! PUT    /userDetails/{id}                          {newPrescription: [..]}
//! DELETE /userDetails/{id}/prescription/{pid}       historical prescription
//! DELETE /userDetails/{id}/newPrescription/{pid}    newly added prescription
//! DELETE /userDetails/{id}                          patient
//! POST   /send-email/{id}                           checkup email
//! GET    /download-excel                            spreadsheet export
//! ```

mod http;
pub mod mock;

pub use http::*;
pub use mock::MockPatientService;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::models::{NewPrescription, NewReview, PrescriptionList, Review};
use crate::normalizer::RawPatient;

/// Suggested file name for the spreadsheet export.
pub const EXPORT_FILE_NAME: &str = "patientDetails.xlsx";

/// Remote call errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The backend operations the dashboard depends on.
///
/// Every method issues exactly one request. A non-2xx status is an error.
#[allow(async_fn_in_trait)]
pub trait PatientService {
    async fn list_reviews(&self) -> ApiResult<Vec<Review>>;

    async fn submit_review(&self, review: &NewReview) -> ApiResult<()>;

    async fn list_patients(&self) -> ApiResult<Vec<RawPatient>>;

    async fn get_patient(&self, patient_id: &str) -> ApiResult<RawPatient>;

    async fn mark_complete(&self, patient_id: &str) -> ApiResult<()>;

    async fn add_prescription(
        &self,
        patient_id: &str,
        prescription: &NewPrescription,
    ) -> ApiResult<()>;

    async fn delete_prescription(
        &self,
        patient_id: &str,
        list: PrescriptionList,
        prescription_id: &str,
    ) -> ApiResult<()>;

    async fn delete_patient(&self, patient_id: &str) -> ApiResult<()>;

    async fn send_email(&self, patient_id: &str) -> ApiResult<()>;

    /// Stream the spreadsheet export into `dest`, returning the byte count.
    async fn download_export(&self, dest: &Path) -> ApiResult<u64>;
}

/// Body of `PUT /userDetails/{id}/complete`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub is_completed: bool,
}

/// Body of `PUT /userDetails/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrescriptionRequest<'a> {
    pub new_prescription: [&'a NewPrescription; 1],
}

/// Request paths, relative to the base URL.
pub mod paths {
    use crate::models::PrescriptionList;

    pub const REVIEWS: &str = "reviews";
    pub const PATIENTS: &str = "userDetails";
    pub const EXPORT: &str = "download-excel";

    pub fn patient(patient_id: &str) -> String {
        format!("{}/{}", PATIENTS, patient_id)
    }

    pub fn complete(patient_id: &str) -> String {
        format!("{}/{}/complete", PATIENTS, patient_id)
    }

    pub fn prescription(patient_id: &str, list: PrescriptionList, prescription_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            PATIENTS,
            patient_id,
            list.path_segment(),
            prescription_id
        )
    }

    pub fn send_email(patient_id: &str) -> String {
        format!("send-email/{}", patient_id)
    }
}
