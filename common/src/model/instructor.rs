use serde::{Deserialize, Serialize};

/// An instructor as stored in the `instructor` table and exchanged over the API.
///
/// `id_number` is the natural key used by the spreadsheet import for both duplicate
/// detection and upsert conflict resolution. `dept` must name an existing department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructor {
    pub id_number: String,
    pub name: String,
    pub dept: String,
}
