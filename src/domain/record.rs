use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reported event, decoded at the intake boundary and carried through
/// the pipeline as a unit.
///
/// This is the canonical representation of a record from intake decode
/// through batching to the dispatch payload. The pipeline never inspects
/// the fields; it only needs records to serialize as a unit and group into
/// ordered batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub user_id: i64,
    pub total: f64,
    pub title: String,
    pub meta: Metadata,
    pub completed: bool,
}

/// Login history and contact numbers attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub logins: Vec<Login>,
    pub phone_numbers: PhoneNumbers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Login {
    pub time: DateTime<Utc>,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumbers {
    pub home: String,
    pub mobile: String,
}
