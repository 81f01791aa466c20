use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One availability entry for an instructor, keyed by `(instructor_name, start_date)`.
///
/// `start_date` travels as an ISO-8601 date (`YYYY-MM-DD`). `status` is free text
/// (e.g. "available", "on leave"); the backend does not interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub instructor_name: String,
    pub start_date: NaiveDate,
    pub status: String,
}
