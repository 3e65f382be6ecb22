//! Shared state for the HTTP API.

use super::cursor::QueryCursor;
use crate::responses::ResponseStore;

/// State shared across all API handlers.
pub struct ApiState {
    pub responses: ResponseStore,
    pub cursor: QueryCursor,
}

impl ApiState {
    pub fn new(responses: ResponseStore, cursor: QueryCursor) -> Self {
        Self { responses, cursor }
    }
}
