pub mod ingest;
pub mod quiz_attempt;
pub mod quiz_session;
