//! Mutation orchestrator for the admin dashboard.
//!
//! Every mutation follows the same sequence:
//! 1. validate local preconditions (no network call on failure)
//! 2. issue one remote call
//! 3. on success, apply the matching store operation
//! 4. publish a success or failure notification
//!
//! The store is only touched after the remote call resolves successfully.
//! There are no retries. State is locked between awaits only, so mutations
//! running concurrently apply in completion order.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::{ApiError, PatientService};
use crate::models::{NewReview, Patient, PrescriptionDraft, PrescriptionList, Review, ReviewTally};
use crate::normalizer::{normalize_patient, normalize_patients, NormalizeError};
use crate::notify::{Notification, NotificationChannel};
use crate::stats::{monthly_activity, DashboardStats, MonthlyData};
use crate::store::{PatientStore, StoreError, Tab, ViewFilter};

/// Dashboard errors.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Remote call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Malformed record: {0}")]
    Normalize(#[from] NormalizeError),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Default)]
struct DashboardState {
    store: PatientStore,
    filter: ViewFilter,
    reviews: Vec<Review>,
    tally: ReviewTally,
    notifications: NotificationChannel,
}

/// Admin dashboard over a remote patient service.
pub struct Dashboard<S> {
    service: S,
    state: Mutex<DashboardState>,
}

impl<S: PatientService> Dashboard<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            state: Mutex::new(DashboardState::default()),
        }
    }

    /// Use a custom notification lifetime.
    pub fn with_notification_ttl(service: S, ttl: std::time::Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| NotificationChannel::default().ttl());
        let state = DashboardState {
            notifications: NotificationChannel::new(ttl),
            ..DashboardState::default()
        };
        Self {
            service,
            state: Mutex::new(state),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reload the whole patient collection. On failure the store is left as it was.
    pub async fn refresh_patients(&self) -> DashboardResult<usize> {
        let raws = match self.service.list_patients().await {
            Ok(raws) => raws,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch patients");
                return Err(e.into());
            }
        };

        let patients = normalize_patients(raws);
        let count = patients.len();
        self.state().store.load_all(patients);
        tracing::info!(count, "patients loaded");
        Ok(count)
    }

    /// Refetch reviews and recompute the good/bad tally. Failure resets the tally.
    pub async fn refresh_reviews(&self) -> DashboardResult<ReviewTally> {
        match self.service.list_reviews().await {
            Ok(reviews) => {
                let tally = ReviewTally::from_reviews(&reviews);
                let mut state = self.state();
                state.reviews = reviews;
                state.tally = tally;
                Ok(tally)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch reviews");
                let mut state = self.state();
                state.reviews.clear();
                state.tally = ReviewTally::default();
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Mark a patient's checkup as complete.
    pub async fn mark_complete(&self, patient_id: &str) -> DashboardResult<()> {
        if patient_id.is_empty() {
            return Err(self.reject("No patient selected"));
        }

        if let Err(e) = self.service.mark_complete(patient_id).await {
            return Err(self.fail(e, "Failed to update patient status"));
        }

        if let Err(e) = self.state().store.mark_complete(patient_id) {
            tracing::warn!(patient_id, error = %e, "completed patient not in store");
        }
        self.succeed("Patient marked as complete");
        Ok(())
    }

    /// Add a prescription to the selected patient, then reload that patient from the server.
    pub async fn add_prescription(&self, draft: &PrescriptionDraft) -> DashboardResult<()> {
        if !draft.is_complete() {
            return Err(self.reject("Please fill all fields"));
        }

        let selected = self.state().store.selected_id().map(str::to_owned);
        let Some(patient_id) = selected else {
            return Err(self.reject("No patient selected"));
        };

        let prescription = draft.issue(Utc::now());
        if let Err(e) = self.service.add_prescription(&patient_id, &prescription).await {
            return Err(self.fail(e, "Failed to add prescription"));
        }

        if let Err(e) = self.reconcile_patient(&patient_id).await {
            tracing::warn!(%patient_id, error = %e, "could not reload patient after adding prescription");
        }
        self.succeed("Prescription added successfully");
        Ok(())
    }

    /// Delete one prescription from the named list.
    ///
    /// The patient is reloaded from the server afterwards; if that fails, the entry
    /// is removed locally from that list only.
    pub async fn delete_prescription(
        &self,
        patient_id: &str,
        list: PrescriptionList,
        prescription_id: &str,
    ) -> DashboardResult<()> {
        if patient_id.is_empty() || prescription_id.is_empty() {
            return Err(self.reject("No prescription selected"));
        }

        if let Err(e) = self
            .service
            .delete_prescription(patient_id, list, prescription_id)
            .await
        {
            return Err(self.fail(e, "Failed to delete prescription"));
        }

        if let Err(e) = self.reconcile_patient(patient_id).await {
            tracing::warn!(patient_id, error = %e, "could not reload patient, removing prescription locally");
            let mut state = self.state();
            if let Some(current) = state.store.get(patient_id) {
                let updated = current.without_prescription(list, prescription_id);
                if let Err(e) = state.store.replace_one(patient_id, updated) {
                    tracing::warn!(patient_id, error = %e, "local prescription removal skipped");
                }
            }
        }
        self.succeed("Prescription deleted successfully");
        Ok(())
    }

    /// Delete a patient, closing its detail view if open.
    pub async fn delete_patient(&self, patient_id: &str) -> DashboardResult<()> {
        if patient_id.is_empty() {
            return Err(self.reject("No patient selected"));
        }

        if let Err(e) = self.service.delete_patient(patient_id).await {
            return Err(self.fail(e, "Failed to delete patient"));
        }

        if self.state().store.remove_one(patient_id).is_none() {
            tracing::warn!(patient_id, "deleted patient was not in store");
        }
        self.succeed("Patient deleted successfully");
        Ok(())
    }

    /// Send the checkup email; a successful send also marks the checkup complete.
    pub async fn send_email(&self, patient_id: &str) -> DashboardResult<()> {
        if patient_id.is_empty() {
            return Err(self.reject("No patient selected"));
        }

        if let Err(e) = self.service.send_email(patient_id).await {
            return Err(self.fail(e, "Failed to send email"));
        }
        self.succeed("Email sent successfully");

        self.mark_complete(patient_id).await
    }

    /// Save the spreadsheet export to `dest`.
    pub async fn download_export(&self, dest: &Path) -> DashboardResult<u64> {
        match self.service.download_export(dest).await {
            Ok(bytes) => {
                tracing::info!(path = %dest.display(), bytes, "export saved");
                self.succeed("File downloaded successfully");
                Ok(bytes)
            }
            Err(e) => Err(self.fail(e, "Failed to download file")),
        }
    }

    /// Submit a review from the public reviews page.
    pub async fn submit_review(&self, review: &NewReview) -> DashboardResult<()> {
        if let Err(message) = review.validate() {
            return Err(self.reject(message));
        }

        if let Err(e) = self.service.submit_review(review).await {
            return Err(self.fail(e, "Your review submission failed"));
        }
        self.succeed("Your review submitted successfully");
        Ok(())
    }

    /// Reload one patient from the server into the store.
    async fn reconcile_patient(&self, patient_id: &str) -> DashboardResult<()> {
        let raw = self.service.get_patient(patient_id).await?;
        let patient = normalize_patient(raw)?;

        if let Err(e) = self.state().store.replace_one(patient_id, patient) {
            match e {
                StoreError::NotFound(_) => {
                    tracing::warn!(patient_id, "reloaded patient no longer in store")
                }
                other => {
                    tracing::warn!(patient_id, error = %other, "reloaded patient rejected")
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    fn succeed(&self, message: &str) {
        tracing::info!(message, "mutation succeeded");
        self.publish(Notification::success(message));
    }

    fn fail(&self, error: ApiError, message: &str) -> DashboardError {
        tracing::error!(%error, message, "mutation failed");
        self.publish(Notification::failure(message));
        DashboardError::Api(error)
    }

    fn reject(&self, message: &str) -> DashboardError {
        tracing::warn!(message, "mutation rejected");
        self.publish(Notification::failure(message));
        DashboardError::Validation(message.to_string())
    }

    fn publish(&self, notification: Notification) {
        self.state().notifications.publish_at(notification, Utc::now());
    }

    /// The notification visible at `now`, if any.
    pub fn notification_at(&self, now: DateTime<Utc>) -> Option<Notification> {
        self.state().notifications.current(now).cloned()
    }

    pub fn notification(&self) -> Option<Notification> {
        self.notification_at(Utc::now())
    }

    /// Advance the notification clock, clearing an expired notification.
    pub fn tick(&self, now: DateTime<Utc>) -> bool {
        self.state().notifications.tick(now)
    }

    // =========================================================================
    // View state
    // =========================================================================

    pub fn set_search(&self, term: impl Into<String>) {
        self.state().filter.search = term.into();
    }

    pub fn set_tab(&self, tab: Tab) {
        self.state().filter.tab = tab;
    }

    pub fn filter(&self) -> ViewFilter {
        self.state().filter.clone()
    }

    /// Patients matching the current search and tab.
    pub fn visible_patients(&self) -> Vec<Arc<Patient>> {
        let state = self.state();
        state.store.view(&state.filter)
    }

    pub fn patients(&self) -> Vec<Arc<Patient>> {
        self.state().store.patients().to_vec()
    }

    pub fn patient(&self, patient_id: &str) -> Option<Arc<Patient>> {
        self.state().store.get(patient_id)
    }

    /// Open a patient's detail view.
    pub fn select_patient(&self, patient_id: &str) -> Result<Arc<Patient>, StoreError> {
        self.state().store.select(patient_id)
    }

    pub fn close_patient(&self) {
        self.state().store.clear_selection();
    }

    pub fn selected_patient(&self) -> Option<Arc<Patient>> {
        self.state().store.selected()
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.state().reviews.clone()
    }

    pub fn stats(&self) -> DashboardStats {
        let state = self.state();
        DashboardStats::new(state.store.patients(), state.tally)
    }

    pub fn monthly_activity(&self, year: i32) -> Vec<MonthlyData> {
        let state = self.state();
        monthly_activity(state.store.patients(), &state.reviews, year)
    }
}
