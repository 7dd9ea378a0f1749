//! reqwest implementation of the remote patient service.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use tokio::io::AsyncWriteExt;

use super::{paths, AddPrescriptionRequest, ApiError, ApiResult, CompleteRequest, PatientService};
use crate::config::ClientConfig;
use crate::models::{NewPrescription, NewReview, PrescriptionList, Review, ReviewListing};
use crate::normalizer::{decode_patient_listing, RawPatient};

/// HTTP client for the clinic backend.
#[derive(Debug, Clone)]
pub struct HttpPatientService {
    client: Client,
    config: ClientConfig,
}

impl HttpPatientService {
    /// Build a client. No timeout is set unless the config asks for one.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Send and reject anything outside 2xx.
    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url = %response.url(), status = status.as_u16(), "response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl PatientService for HttpPatientService {
    async fn list_reviews(&self) -> ApiResult<Vec<Review>> {
        let response = self.send(self.client.get(self.url(paths::REVIEWS))).await?;
        let bytes = response.bytes().await?;
        let listing: ReviewListing = serde_json::from_slice(&bytes)?;
        Ok(listing.into_reviews())
    }

    async fn submit_review(&self, review: &NewReview) -> ApiResult<()> {
        self.send(self.client.post(self.url(paths::REVIEWS)).json(review))
            .await?;
        Ok(())
    }

    async fn list_patients(&self) -> ApiResult<Vec<RawPatient>> {
        let response = self.send(self.client.get(self.url(paths::PATIENTS))).await?;
        let bytes = response.bytes().await?;
        let records: Vec<serde_json::Value> = serde_json::from_slice(&bytes)?;
        Ok(decode_patient_listing(records))
    }

    async fn get_patient(&self, patient_id: &str) -> ApiResult<RawPatient> {
        let request = self.client.get(self.url(&paths::patient(patient_id)));
        let response = match self.send(request).await {
            Err(ApiError::Status { status: 404, .. }) => {
                return Err(ApiError::NotFound(patient_id.to_string()))
            }
            other => other?,
        };
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn mark_complete(&self, patient_id: &str) -> ApiResult<()> {
        let request = self
            .client
            .put(self.url(&paths::complete(patient_id)))
            .json(&CompleteRequest { is_completed: true });
        self.send(request).await?;
        Ok(())
    }

    async fn add_prescription(
        &self,
        patient_id: &str,
        prescription: &NewPrescription,
    ) -> ApiResult<()> {
        let request = self
            .client
            .put(self.url(&paths::patient(patient_id)))
            .json(&AddPrescriptionRequest {
                new_prescription: [prescription],
            });
        self.send(request).await?;
        Ok(())
    }

    async fn delete_prescription(
        &self,
        patient_id: &str,
        list: PrescriptionList,
        prescription_id: &str,
    ) -> ApiResult<()> {
        let path = paths::prescription(patient_id, list, prescription_id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }

    async fn delete_patient(&self, patient_id: &str) -> ApiResult<()> {
        self.send(self.client.delete(self.url(&paths::patient(patient_id))))
            .await?;
        Ok(())
    }

    async fn send_email(&self, patient_id: &str) -> ApiResult<()> {
        self.send(self.client.post(self.url(&paths::send_email(patient_id))))
            .await?;
        Ok(())
    }

    async fn download_export(&self, dest: &Path) -> ApiResult<u64> {
        let response = self.send(self.client.get(self.url(paths::EXPORT))).await?;

        // Stream into a sibling temp file; `dest` is only replaced once the body is complete.
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let (file, part_path) = tempfile::NamedTempFile::new_in(dir)?.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        part_path.persist(dest).map_err(|e| ApiError::Io(e.error))?;
        Ok(written)
    }
}
