//! In-memory patient service for tests and offline demos.
//!
//! Behaves like the backend for the operations the dashboard uses, records
//! every call, and can be told to fail specific calls.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ApiError, ApiResult, PatientService};
use crate::models::{NewPrescription, NewReview, PrescriptionList, Review};
use crate::normalizer::{RawPatient, RawPrescription};

/// Remote operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    ListReviews,
    SubmitReview,
    ListPatients,
    GetPatient,
    MarkComplete,
    AddPrescription,
    DeletePrescription,
    DeletePatient,
    SendEmail,
    DownloadExport,
}

#[derive(Debug, Default)]
struct MockState {
    patients: Vec<RawPatient>,
    reviews: Vec<Review>,
    submitted_reviews: Vec<NewReview>,
    export: Vec<u8>,
    failing: HashSet<MockCall>,
    calls: Vec<MockCall>,
    emails_sent: Vec<String>,
}

/// Scriptable stand-in for the clinic backend.
#[derive(Debug, Default)]
pub struct MockPatientService {
    state: Mutex<MockState>,
}

impl MockPatientService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patients(self, patients: Vec<RawPatient>) -> Self {
        self.lock().patients = patients;
        self
    }

    pub fn with_reviews(self, reviews: Vec<Review>) -> Self {
        self.lock().reviews = reviews;
        self
    }

    pub fn with_export(self, bytes: Vec<u8>) -> Self {
        self.lock().export = bytes;
        self
    }

    /// Make every later call of this kind fail.
    pub fn fail_on(&self, call: MockCall) {
        self.lock().failing.insert(call);
    }

    pub fn recover(&self, call: MockCall) {
        self.lock().failing.remove(&call);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, call: MockCall) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Server-side copy of the patient records.
    pub fn patients(&self) -> Vec<RawPatient> {
        self.lock().patients.clone()
    }

    pub fn submitted_reviews(&self) -> Vec<NewReview> {
        self.lock().submitted_reviews.clone()
    }

    pub fn emails_sent(&self) -> Vec<String> {
        self.lock().emails_sent.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log the call, then fail it if scripted to.
    fn enter(&self, call: MockCall) -> ApiResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(&call) {
            return Err(ApiError::Unavailable(format!("{:?} scripted to fail", call)));
        }
        Ok(state)
    }
}

fn find_patient<'a>(
    patients: &'a mut [RawPatient],
    patient_id: &str,
) -> ApiResult<&'a mut RawPatient> {
    patients
        .iter_mut()
        .find(|p| p.identifier() == Some(patient_id))
        .ok_or_else(|| ApiError::NotFound(patient_id.to_string()))
}

impl PatientService for MockPatientService {
    async fn list_reviews(&self) -> ApiResult<Vec<Review>> {
        let state = self.enter(MockCall::ListReviews)?;
        Ok(state.reviews.clone())
    }

    async fn submit_review(&self, review: &NewReview) -> ApiResult<()> {
        let mut state = self.enter(MockCall::SubmitReview)?;
        state.submitted_reviews.push(review.clone());
        state.reviews.push(Review {
            name: review.name.clone(),
            rating: review.rating,
            date: chrono::Utc::now().date_naive().to_string(),
            comment: review.comment.clone(),
        });
        Ok(())
    }

    async fn list_patients(&self) -> ApiResult<Vec<RawPatient>> {
        let state = self.enter(MockCall::ListPatients)?;
        Ok(state.patients.clone())
    }

    async fn get_patient(&self, patient_id: &str) -> ApiResult<RawPatient> {
        let mut state = self.enter(MockCall::GetPatient)?;
        find_patient(&mut state.patients, patient_id).map(|p| p.clone())
    }

    async fn mark_complete(&self, patient_id: &str) -> ApiResult<()> {
        let mut state = self.enter(MockCall::MarkComplete)?;
        find_patient(&mut state.patients, patient_id)?.is_completed = Some(true);
        Ok(())
    }

    async fn add_prescription(
        &self,
        patient_id: &str,
        prescription: &NewPrescription,
    ) -> ApiResult<()> {
        let mut state = self.enter(MockCall::AddPrescription)?;
        let patient = find_patient(&mut state.patients, patient_id)?;
        patient
            .new_prescription
            .get_or_insert_with(Vec::new)
            .push(RawPrescription {
                id: None,
                legacy_id: Some(uuid::Uuid::new_v4().to_string()),
                tablets: prescription.tablets.clone(),
                dosage: prescription.dosage.clone(),
                duration: prescription.duration.clone(),
                date: prescription.date.clone(),
            });
        Ok(())
    }

    async fn delete_prescription(
        &self,
        patient_id: &str,
        list: PrescriptionList,
        prescription_id: &str,
    ) -> ApiResult<()> {
        let mut state = self.enter(MockCall::DeletePrescription)?;
        let patient = find_patient(&mut state.patients, patient_id)?;
        let entries = match list {
            PrescriptionList::Historical => patient.prescription.as_mut(),
            PrescriptionList::NewlyAdded => patient.new_prescription.as_mut(),
        }
        .ok_or_else(|| ApiError::NotFound(prescription_id.to_string()))?;

        let before = entries.len();
        entries.retain(|p| p.identifier() != Some(prescription_id));
        if entries.len() == before {
            return Err(ApiError::NotFound(prescription_id.to_string()));
        }
        Ok(())
    }

    async fn delete_patient(&self, patient_id: &str) -> ApiResult<()> {
        let mut state = self.enter(MockCall::DeletePatient)?;
        let before = state.patients.len();
        state.patients.retain(|p| p.identifier() != Some(patient_id));
        if state.patients.len() == before {
            return Err(ApiError::NotFound(patient_id.to_string()));
        }
        Ok(())
    }

    async fn send_email(&self, patient_id: &str) -> ApiResult<()> {
        let mut state = self.enter(MockCall::SendEmail)?;
        find_patient(&mut state.patients, patient_id)?;
        state.emails_sent.push(patient_id.to_string());
        Ok(())
    }

    async fn download_export(&self, dest: &Path) -> ApiResult<u64> {
        let bytes = self.enter(MockCall::DownloadExport)?.export.clone();
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}
