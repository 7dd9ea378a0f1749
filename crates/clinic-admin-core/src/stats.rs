//! Dashboard summary figures.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Patient, Review, ReviewTally};

/// Figures shown on the dashboard's stat cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_patients: u32,
    pub completed_checkups: u32,
    pub good_reviews: u32,
    pub bad_reviews: u32,
}

impl DashboardStats {
    pub fn new(patients: &[Arc<Patient>], tally: ReviewTally) -> Self {
        Self {
            total_patients: patients.len() as u32,
            completed_checkups: patients.iter().filter(|p| p.is_completed).count() as u32,
            good_reviews: tally.good,
            bad_reviews: tally.bad,
        }
    }

    pub fn pending_checkups(&self) -> u32 {
        self.total_patients - self.completed_checkups
    }
}

/// One month of activity for the dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyData {
    /// Short month name ("Jan")
    pub name: String,
    pub patients: u32,
    pub good_reviews: u32,
    pub bad_reviews: u32,
}

/// Per-month counts for `year`: patients by creation date, reviews by review date.
///
/// Records whose dates cannot be parsed are left out.
pub fn monthly_activity(patients: &[Arc<Patient>], reviews: &[Review], year: i32) -> Vec<MonthlyData> {
    let mut months: Vec<MonthlyData> = (1..=12u8)
        .map(|m| MonthlyData {
            name: month_name(m),
            patients: 0,
            good_reviews: 0,
            bad_reviews: 0,
        })
        .collect();

    for patient in patients {
        if let Some(date) = parse_date(&patient.created_at).filter(|d| d.year() == year) {
            months[date.month0() as usize].patients += 1;
        }
    }

    for review in reviews {
        if let Some(date) = parse_date(&review.date).filter(|d| d.year() == year) {
            let month = &mut months[date.month0() as usize];
            if review.is_good() {
                month.good_reviews += 1;
            } else {
                month.bad_reviews += 1;
            }
        }
    }

    months
}

fn month_name(month: u8) -> String {
    Month::try_from(month)
        .map(|m| m.name()[..3].to_string())
        .unwrap_or_default()
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` and plain dates.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}
