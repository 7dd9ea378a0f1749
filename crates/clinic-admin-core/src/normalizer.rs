//! Record normalizer.
//!
//! The remote service is loose about record shapes:
//! - identifiers arrive as `id`, as the legacy `_id`, or as both
//! - `prescription` / `newPrescription` may be missing
//! - `age` and `phno` may be numbers or strings, scalars may be `null`
//!
//! Everything passes through here exactly once on the way into the store.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Patient, Prescription};

/// Normalization errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{kind} record has neither `id` nor `_id`")]
    MissingIdentifier { kind: &'static str },
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Patient record as the server sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPatient {
    #[serde(default, deserialize_with = "loose_opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "loose_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub email: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub phno: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub age: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub address: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub sex: String,
    #[serde(default)]
    pub medical_concern: Option<Vec<String>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub prescription: Option<Vec<RawPrescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_prescription: Option<Vec<RawPrescription>>,
    #[serde(default, deserialize_with = "loose_string")]
    pub created_at: String,
}

impl RawPatient {
    /// Identifier under the canonical-then-legacy rule.
    pub fn identifier(&self) -> Option<&str> {
        pick_identifier(self.id.as_deref(), self.legacy_id.as_deref())
    }
}

/// Prescription record as the server sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPrescription {
    #[serde(default, deserialize_with = "loose_opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "loose_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub tablets: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub dosage: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub duration: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub date: String,
}

impl RawPrescription {
    /// Identifier under the canonical-then-legacy rule.
    pub fn identifier(&self) -> Option<&str> {
        pick_identifier(self.id.as_deref(), self.legacy_id.as_deref())
    }
}

/// Canonical field when present and non-empty, else the legacy field.
pub fn pick_identifier<'a>(canonical: Option<&'a str>, legacy: Option<&'a str>) -> Option<&'a str> {
    canonical
        .filter(|id| !id.is_empty())
        .or_else(|| legacy.filter(|id| !id.is_empty()))
}

/// Normalize one prescription.
pub fn normalize_prescription(raw: RawPrescription) -> NormalizeResult<Prescription> {
    let id = raw
        .identifier()
        .ok_or(NormalizeError::MissingIdentifier {
            kind: "prescription",
        })?
        .to_string();

    Ok(Prescription {
        id,
        tablets: raw.tablets,
        dosage: raw.dosage,
        duration: raw.duration,
        date: raw.date,
    })
}

/// Normalize one patient, including both prescription lists.
///
/// Prescriptions without any identifier cannot be addressed for deletion and are dropped.
pub fn normalize_patient(raw: RawPatient) -> NormalizeResult<Patient> {
    let id = raw
        .identifier()
        .ok_or(NormalizeError::MissingIdentifier { kind: "patient" })?
        .to_string();

    let prescription = normalize_list(&id, raw.prescription.unwrap_or_default());
    let new_prescription = raw.new_prescription.map(|list| normalize_list(&id, list));

    Ok(Patient {
        id,
        name: raw.name,
        email: raw.email,
        phone: raw.phno,
        age: raw.age,
        address: raw.address,
        sex: raw.sex,
        medical_concern: raw.medical_concern.unwrap_or_default(),
        is_completed: raw.is_completed.unwrap_or(false),
        prescription,
        new_prescription,
        created_at: raw.created_at,
    })
}

/// Decode a listing record by record, skipping records that do not fit the wire shape.
pub fn decode_patient_listing(values: Vec<Value>) -> Vec<RawPatient> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<RawPatient>(value) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable patient record");
                None
            }
        })
        .collect()
}

/// Normalize a full listing, skipping records that cannot be identified.
pub fn normalize_patients(raws: Vec<RawPatient>) -> Vec<Patient> {
    raws.into_iter()
        .filter_map(|raw| match normalize_patient(raw) {
            Ok(patient) => Some(patient),
            Err(e) => {
                tracing::warn!(error = %e, "skipping patient record");
                None
            }
        })
        .collect()
}

fn normalize_list(patient_id: &str, raws: Vec<RawPrescription>) -> Vec<Prescription> {
    raws.into_iter()
        .filter_map(|raw| match normalize_prescription(raw) {
            Ok(prescription) => Some(prescription),
            Err(e) => {
                tracing::warn!(patient_id, error = %e, "skipping prescription record");
                None
            }
        })
        .collect()
}

impl From<Prescription> for RawPrescription {
    fn from(p: Prescription) -> Self {
        Self {
            id: Some(p.id),
            legacy_id: None,
            tablets: p.tablets,
            dosage: p.dosage,
            duration: p.duration,
            date: p.date,
        }
    }
}

impl From<Patient> for RawPatient {
    fn from(p: Patient) -> Self {
        Self {
            id: Some(p.id),
            legacy_id: None,
            name: p.name,
            email: p.email,
            phno: p.phone,
            age: p.age,
            address: p.address,
            sex: p.sex,
            medical_concern: Some(p.medical_concern),
            is_completed: Some(p.is_completed),
            prescription: Some(p.prescription.into_iter().map(Into::into).collect()),
            new_prescription: p
                .new_prescription
                .map(|list| list.into_iter().map(Into::into).collect()),
            created_at: p.created_at,
        }
    }
}

fn loose_value_to_string<E: de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(E::custom(format!("expected a string or number, found {}", other))),
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(loose_value_to_string::<D::Error>(value)?.unwrap_or_default())
}

fn loose_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    loose_value_to_string::<D::Error>(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawPatient {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_prefers_canonical_identifier() {
        let patient = normalize_patient(raw(json!({"id": "a1", "_id": "legacy", "name": "Anna"}))).unwrap();
        assert_eq!(patient.id, "a1");
    }

    #[test]
    fn test_falls_back_to_legacy_identifier() {
        let patient = normalize_patient(raw(json!({"_id": "6650f0", "name": "Anna"}))).unwrap();
        assert_eq!(patient.id, "6650f0");

        // Empty canonical field counts as absent
        let patient = normalize_patient(raw(json!({"id": "", "_id": "6650f0"}))).unwrap();
        assert_eq!(patient.id, "6650f0");
    }

    #[test]
    fn test_missing_identifier() {
        let err = normalize_patient(raw(json!({"name": "Anna"}))).unwrap_err();
        assert_eq!(err, NormalizeError::MissingIdentifier { kind: "patient" });
    }

    #[test]
    fn test_sub_collections() {
        let patient = normalize_patient(raw(json!({
            "_id": "1",
            "prescription": [{"_id": "p1", "tablets": "Paracetamol"}, {"tablets": "no id"}],
        })))
        .unwrap();

        assert_eq!(patient.prescription.len(), 1);
        assert_eq!(patient.prescription[0].id, "p1");
        assert_eq!(patient.new_prescription, None);

        let patient = normalize_patient(raw(json!({"_id": "1"}))).unwrap();
        assert!(patient.prescription.is_empty());
        assert_eq!(patient.new_prescription, None);

        let patient = normalize_patient(raw(json!({"_id": "1", "newPrescription": []}))).unwrap();
        assert_eq!(patient.new_prescription, Some(vec![]));
    }

    #[test]
    fn test_loose_scalars() {
        let patient = normalize_patient(raw(json!({
            "_id": 42,
            "age": 37,
            "phno": 5550100,
            "address": null,
            "medicalConcern": ["Diabetes", "Asthma"],
            "isCompleted": true,
        })))
        .unwrap();

        assert_eq!(patient.id, "42");
        assert_eq!(patient.age, "37");
        assert_eq!(patient.phone, "5550100");
        assert_eq!(patient.address, "");
        assert_eq!(patient.medical_concern, vec!["Diabetes", "Asthma"]);
        assert!(patient.is_completed);
    }

    #[test]
    fn test_normalize_patients_skips_unidentified() {
        let patients = normalize_patients(vec![
            raw(json!({"id": "1", "name": "Anna"})),
            raw(json!({"name": "Ghost"})),
            raw(json!({"_id": "2", "name": "Bob"})),
        ]);
        let ids: Vec<_> = patients.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_decode_listing_skips_malformed_records() {
        let raws = decode_patient_listing(vec![
            json!({"_id": "1", "name": "Anna"}),
            json!({"_id": "2", "name": "Bob", "isCompleted": "true"}),
            json!({"_id": "3", "name": {"first": "Cara"}}),
            json!("not a record"),
            json!({"id": "4", "name": "Dan", "isCompleted": true}),
        ]);

        let patients = normalize_patients(raws);
        let ids: Vec<_> = patients.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        assert!(patients[1].is_completed);
    }

    #[test]
    fn test_idempotent_through_wire() {
        let first = normalize_patient(raw(json!({
            "_id": "1",
            "name": "Anna",
            "prescription": [{"_id": "p1", "tablets": "Paracetamol"}],
            "newPrescription": [{"id": "p9", "tablets": "Ibuprofen"}],
        })))
        .unwrap();

        let wire = serde_json::to_value(&first).unwrap();
        let second = normalize_patient(raw(wire)).unwrap();
        assert_eq!(first, second);

        let third = normalize_patient(RawPatient::from(second.clone())).unwrap();
        assert_eq!(second, third);
    }
}
