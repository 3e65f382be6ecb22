//! Read-only HTTP API over the stored responses.
//!
//! Every endpoint answers with JSON. Failures surface as empty bodies (`[]`
//! or `{}`), never as error statuses.

mod cursor;
mod responses;
mod server;
mod state;

pub use cursor::QueryCursor;
pub use server::{router, start_http_server};
pub use state::ApiState;
