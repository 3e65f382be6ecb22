//! The language report conversation: form definition, canned messages, and the flow.

pub mod flow;
pub mod form;
pub mod messages;

pub use flow::ReportFlow;
pub use form::SurveyAnswers;
