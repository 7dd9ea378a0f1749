//! Patient review models and the good/bad aggregate.

use serde::{Deserialize, Serialize};

/// Lowest rating counted as a good review.
pub const GOOD_REVIEW_THRESHOLD: u8 = 4;

/// A published patient review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    #[serde(default)]
    pub name: String,
    /// Star rating, 1 to 5
    pub rating: u8,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub comment: String,
}

impl Review {
    pub fn is_good(&self) -> bool {
        self.rating >= GOOD_REVIEW_THRESHOLD
    }
}

/// The reviews listing comes back either bare or wrapped in `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReviewListing {
    List(Vec<Review>),
    Envelope { data: Vec<Review> },
}

impl ReviewListing {
    pub fn into_reviews(self) -> Vec<Review> {
        match self {
            ReviewListing::List(reviews) => reviews,
            ReviewListing::Envelope { data } => data,
        }
    }
}

/// Review submitted from the public reviews page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewReview {
    pub name: String,
    pub email: String,
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    /// Check the form before it is sent.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() || self.comment.trim().is_empty() {
            return Err("Please fill all fields");
        }
        if !(1..=5).contains(&self.rating) {
            return Err("Please choose a rating between 1 and 5");
        }
        Ok(())
    }
}

/// Good/bad review counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewTally {
    pub good: u32,
    pub bad: u32,
}

impl ReviewTally {
    /// Fold a fetched review list into counts.
    pub fn from_reviews(reviews: &[Review]) -> Self {
        reviews.iter().fold(Self::default(), |mut tally, review| {
            if review.is_good() {
                tally.good += 1;
            } else {
                tally.bad += 1;
            }
            tally
        })
    }

    pub fn total(&self) -> u32 {
        self.good + self.bad
    }
}
