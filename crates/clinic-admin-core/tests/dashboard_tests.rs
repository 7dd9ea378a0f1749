//! Dashboard orchestration tests against the in-memory service.

use chrono::{Duration, Utc};
use serde_json::json;

use clinic_admin_core::api::mock::{MockCall, MockPatientService};
use clinic_admin_core::models::{NewReview, PrescriptionDraft, PrescriptionList, Review};
use clinic_admin_core::normalizer::RawPatient;
use clinic_admin_core::{Dashboard, DashboardError, Tab};

fn raw(value: serde_json::Value) -> RawPatient {
    serde_json::from_value(value).unwrap()
}

fn seed_patients() -> Vec<RawPatient> {
    vec![
        raw(json!({
            "_id": "1",
            "name": "Anna",
            "email": "anna@example.com",
            "phno": "555-0100",
            "age": 34,
            "isCompleted": false,
            "prescription": [
                {"_id": "p1", "tablets": "Paracetamol", "dosage": "1-0-1", "duration": "5 days", "date": "2024-01-02"},
                {"_id": "p2", "tablets": "Cetirizine", "dosage": "0-0-1", "duration": "7 days", "date": "2024-01-02"}
            ],
            "newPrescription": [
                {"_id": "p1", "tablets": "Amoxicillin", "dosage": "1-1-1", "duration": "3 days", "date": "2024-02-10"}
            ],
            "createdAt": "2024-01-02T09:30:00.000Z"
        })),
        raw(json!({
            "id": "2",
            "name": "Bob",
            "email": "bob@example.com",
            "phno": "555-0199",
            "isCompleted": false,
            "createdAt": "2024-02-11T14:00:00.000Z"
        })),
    ]
}

fn review(rating: u8) -> Review {
    Review {
        name: "Reviewer".into(),
        rating,
        date: "2024-03-01".into(),
        comment: "Visit".into(),
    }
}

async fn loaded_dashboard() -> Dashboard<MockPatientService> {
    let service = MockPatientService::new().with_patients(seed_patients());
    let dashboard = Dashboard::new(service);
    dashboard.refresh_patients().await.unwrap();
    dashboard
}

fn last_message(dashboard: &Dashboard<MockPatientService>) -> String {
    dashboard.notification().unwrap().message
}

#[tokio::test]
async fn test_refresh_normalizes_records() {
    let dashboard = loaded_dashboard().await;

    let patients = dashboard.patients();
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0].id, "1");
    assert_eq!(patients[0].age, "34");
    assert_eq!(patients[0].prescription[0].id, "p1");
    assert!(patients[1].prescription.is_empty());
    assert!(patients[1].new_prescription.is_none());
}

#[tokio::test]
async fn test_refresh_failure_keeps_store() {
    let dashboard = loaded_dashboard().await;
    dashboard.service().fail_on(MockCall::ListPatients);

    assert!(dashboard.refresh_patients().await.is_err());
    assert_eq!(dashboard.patients().len(), 2);
}

#[tokio::test]
async fn test_visible_patients_follow_filter() {
    let dashboard = loaded_dashboard().await;

    dashboard.set_tab(Tab::Pending);
    assert_eq!(dashboard.visible_patients().len(), 2);

    dashboard.mark_complete("2").await.unwrap();
    let pending: Vec<_> = dashboard.visible_patients().iter().map(|p| p.id.clone()).collect();
    assert_eq!(pending, vec!["1"]);

    dashboard.set_tab(Tab::All);
    dashboard.set_search("BOB");
    let found: Vec<_> = dashboard.visible_patients().iter().map(|p| p.id.clone()).collect();
    assert_eq!(found, vec!["2"]);
}

#[tokio::test]
async fn test_mark_complete_updates_selection() {
    let dashboard = loaded_dashboard().await;
    dashboard.select_patient("2").unwrap();

    dashboard.mark_complete("2").await.unwrap();

    assert!(dashboard.patient("2").unwrap().is_completed);
    assert!(dashboard.selected_patient().unwrap().is_completed);
    assert!(!dashboard.patient("1").unwrap().is_completed);
    assert_eq!(last_message(&dashboard), "Patient marked as complete");
}

#[tokio::test]
async fn test_mark_complete_failure_leaves_store() {
    let dashboard = loaded_dashboard().await;
    dashboard.service().fail_on(MockCall::MarkComplete);

    let err = dashboard.mark_complete("1").await.unwrap_err();

    assert!(matches!(err, DashboardError::Api(_)));
    assert!(!dashboard.patient("1").unwrap().is_completed);
    let notification = dashboard.notification().unwrap();
    assert!(!notification.is_success());
    assert_eq!(notification.message, "Failed to update patient status");
}

#[tokio::test]
async fn test_send_email_chains_into_complete() {
    let dashboard = loaded_dashboard().await;

    dashboard.send_email("1").await.unwrap();

    assert_eq!(dashboard.service().emails_sent(), vec!["1"]);
    assert_eq!(dashboard.service().call_count(MockCall::MarkComplete), 1);
    assert!(dashboard.patient("1").unwrap().is_completed);
    assert_eq!(last_message(&dashboard), "Patient marked as complete");
}

#[tokio::test]
async fn test_failed_send_email_does_not_complete() {
    let dashboard = loaded_dashboard().await;
    dashboard.service().fail_on(MockCall::SendEmail);

    assert!(dashboard.send_email("1").await.is_err());

    assert_eq!(dashboard.service().call_count(MockCall::MarkComplete), 0);
    assert!(!dashboard.patient("1").unwrap().is_completed);
    assert_eq!(last_message(&dashboard), "Failed to send email");
}

#[tokio::test]
async fn test_add_prescription_validation() {
    let dashboard = loaded_dashboard().await;
    let calls_before = dashboard.service().calls().len();

    // Missing field
    dashboard.select_patient("1").unwrap();
    let err = dashboard
        .add_prescription(&PrescriptionDraft::new("Paracetamol", "", "5 days"))
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Validation(_)));
    assert_eq!(last_message(&dashboard), "Please fill all fields");

    // No patient selected
    dashboard.close_patient();
    let err = dashboard
        .add_prescription(&PrescriptionDraft::new("Paracetamol", "1-0-1", "5 days"))
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Validation(_)));
    assert_eq!(last_message(&dashboard), "No patient selected");

    assert_eq!(dashboard.service().calls().len(), calls_before);
}

#[tokio::test]
async fn test_add_prescription_reloads_patient() {
    let dashboard = loaded_dashboard().await;
    dashboard.select_patient("2").unwrap();

    dashboard
        .add_prescription(&PrescriptionDraft::new("Ibuprofen", "1-0-1", "3 days"))
        .await
        .unwrap();

    let calls = dashboard.service().calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[MockCall::AddPrescription, MockCall::GetPatient]
    );

    let bob = dashboard.selected_patient().unwrap();
    let added = bob.prescriptions(PrescriptionList::NewlyAdded);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].tablets, "Ibuprofen");
    // Server-assigned legacy id was normalized
    assert!(!added[0].id.is_empty());
    assert_eq!(last_message(&dashboard), "Prescription added successfully");
}

#[tokio::test]
async fn test_add_prescription_failure_leaves_store() {
    let dashboard = loaded_dashboard().await;
    dashboard.select_patient("2").unwrap();
    dashboard.service().fail_on(MockCall::AddPrescription);

    assert!(dashboard
        .add_prescription(&PrescriptionDraft::new("Ibuprofen", "1-0-1", "3 days"))
        .await
        .is_err());

    assert!(dashboard.patient("2").unwrap().new_prescription.is_none());
    assert_eq!(dashboard.service().call_count(MockCall::GetPatient), 0);
    assert_eq!(last_message(&dashboard), "Failed to add prescription");
}

#[tokio::test]
async fn test_delete_historical_prescription_keeps_new_list() {
    let dashboard = loaded_dashboard().await;

    dashboard
        .delete_prescription("1", PrescriptionList::Historical, "p1")
        .await
        .unwrap();

    let anna = dashboard.patient("1").unwrap();
    let historical: Vec<_> = anna.prescription.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(historical, vec!["p2"]);
    let added = anna.prescriptions(PrescriptionList::NewlyAdded);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].id, "p1");
    assert_eq!(added[0].tablets, "Amoxicillin");
}

#[tokio::test]
async fn test_delete_prescription_local_fallback() {
    let dashboard = loaded_dashboard().await;
    dashboard.service().fail_on(MockCall::GetPatient);

    dashboard
        .delete_prescription("1", PrescriptionList::NewlyAdded, "p1")
        .await
        .unwrap();

    let anna = dashboard.patient("1").unwrap();
    assert!(anna.prescriptions(PrescriptionList::NewlyAdded).is_empty());
    assert_eq!(anna.prescription.len(), 2);
    assert_eq!(last_message(&dashboard), "Prescription deleted successfully");
}

#[tokio::test]
async fn test_delete_prescription_failure() {
    let dashboard = loaded_dashboard().await;

    // Unknown prescription: the server refuses
    assert!(dashboard
        .delete_prescription("2", PrescriptionList::Historical, "p1")
        .await
        .is_err());
    assert_eq!(last_message(&dashboard), "Failed to delete prescription");
    assert_eq!(dashboard.service().call_count(MockCall::GetPatient), 0);
}

#[tokio::test]
async fn test_delete_patient_closes_detail_view() {
    let dashboard = loaded_dashboard().await;
    dashboard.select_patient("1").unwrap();

    dashboard.delete_patient("1").await.unwrap();

    assert!(dashboard.patient("1").is_none());
    assert!(dashboard.selected_patient().is_none());
    assert_eq!(dashboard.patients().len(), 1);
    assert_eq!(last_message(&dashboard), "Patient deleted successfully");
}

#[tokio::test]
async fn test_delete_patient_failure_keeps_patient() {
    let dashboard = loaded_dashboard().await;
    dashboard.select_patient("1").unwrap();
    dashboard.service().fail_on(MockCall::DeletePatient);

    assert!(dashboard.delete_patient("1").await.is_err());

    assert!(dashboard.patient("1").is_some());
    assert_eq!(dashboard.selected_patient().unwrap().id, "1");
    assert_eq!(last_message(&dashboard), "Failed to delete patient");
}

#[tokio::test]
async fn test_concurrent_mutations_both_apply() {
    let dashboard = loaded_dashboard().await;

    let (deleted, completed) = tokio::join!(dashboard.delete_patient("1"), dashboard.mark_complete("2"));
    deleted.unwrap();
    completed.unwrap();

    let patients = dashboard.patients();
    assert_eq!(patients.len(), 1);
    assert!(patients[0].is_completed);
}

#[tokio::test]
async fn test_review_tally_and_stats() {
    let service = MockPatientService::new()
        .with_patients(seed_patients())
        .with_reviews(vec![review(5), review(4), review(2)]);
    let dashboard = Dashboard::new(service);
    dashboard.refresh_patients().await.unwrap();

    let tally = dashboard.refresh_reviews().await.unwrap();
    assert_eq!((tally.good, tally.bad), (2, 1));

    dashboard.mark_complete("1").await.unwrap();
    let stats = dashboard.stats();
    assert_eq!(stats.total_patients, 2);
    assert_eq!(stats.completed_checkups, 1);
    assert_eq!(stats.good_reviews, 2);
    assert_eq!(stats.bad_reviews, 1);

    dashboard.service().fail_on(MockCall::ListReviews);
    assert!(dashboard.refresh_reviews().await.is_err());
    assert_eq!(dashboard.stats().good_reviews, 0);
    assert!(dashboard.reviews().is_empty());
}

#[tokio::test]
async fn test_monthly_activity() {
    let service = MockPatientService::new()
        .with_patients(seed_patients())
        .with_reviews(vec![review(5), review(1)]);
    let dashboard = Dashboard::new(service);
    dashboard.refresh_patients().await.unwrap();
    dashboard.refresh_reviews().await.unwrap();

    let months = dashboard.monthly_activity(2024);
    assert_eq!(months[0].patients, 1);
    assert_eq!(months[1].patients, 1);
    assert_eq!(months[2].good_reviews, 1);
    assert_eq!(months[2].bad_reviews, 1);
}

#[tokio::test]
async fn test_submit_review() {
    let dashboard = Dashboard::new(MockPatientService::new());

    let mut form = NewReview {
        name: "Anna".into(),
        email: "anna@example.com".into(),
        rating: 0,
        comment: "Very thorough checkup".into(),
    };
    assert!(matches!(
        dashboard.submit_review(&form).await,
        Err(DashboardError::Validation(_))
    ));
    assert!(dashboard.service().submitted_reviews().is_empty());

    form.rating = 5;
    dashboard.submit_review(&form).await.unwrap();
    assert_eq!(dashboard.service().submitted_reviews(), vec![form]);
    assert_eq!(last_message(&dashboard), "Your review submitted successfully");

    let tally = dashboard.refresh_reviews().await.unwrap();
    assert_eq!(tally.good, 1);
}

#[tokio::test]
async fn test_download_export() {
    let bytes = b"PK\x03\x04 fake workbook".to_vec();
    let dashboard = Dashboard::new(MockPatientService::new().with_export(bytes.clone()));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("patientDetails.xlsx");

    let written = dashboard.download_export(&dest).await.unwrap();

    assert_eq!(written, bytes.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), bytes);
    assert_eq!(last_message(&dashboard), "File downloaded successfully");

    dashboard.service().fail_on(MockCall::DownloadExport);
    assert!(dashboard.download_export(&dest).await.is_err());
    assert_eq!(last_message(&dashboard), "Failed to download file");
}

#[tokio::test]
async fn test_notification_expires() {
    let dashboard = loaded_dashboard().await;
    dashboard.delete_patient("2").await.unwrap();

    let now = Utc::now();
    assert!(dashboard.notification_at(now).is_some());
    assert!(dashboard.notification_at(now + Duration::seconds(4)).is_none());
    assert!(dashboard.tick(now + Duration::seconds(4)));
    assert!(dashboard.notification().is_none());
}

#[tokio::test]
async fn test_custom_notification_ttl() {
    let service = MockPatientService::new().with_patients(seed_patients());
    let dashboard = Dashboard::with_notification_ttl(service, std::time::Duration::from_secs(30));
    dashboard.refresh_patients().await.unwrap();
    dashboard.mark_complete("1").await.unwrap();

    assert!(dashboard
        .notification_at(Utc::now() + Duration::seconds(10))
        .is_some());
}
