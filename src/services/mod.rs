pub mod ingest_service;
pub mod notification_service;
pub mod quiz_service;
pub mod submission_service;
