use crate::model::import::WriteMode;
use serde::Deserialize;

/// Query string accepted by the import routes, e.g. `?mode=strict`.
/// A missing `mode` falls back to the server's configured default.
#[derive(Deserialize, Debug, Default)]
pub struct ImportQuery {
    pub mode: Option<WriteMode>,
}

/// Body of `PUT /availability/{instructor_name}/{start_date}`.
#[derive(Deserialize, Debug)]
pub struct AvailabilityStatusUpdate {
    pub status: String,
}
