//! Chat platform adapters.

#[cfg(test)]
pub(crate) mod fake;
pub mod slack;
pub mod traits;

pub use slack::SlackAdapter;
pub use traits::{InboundStream, Messaging};
