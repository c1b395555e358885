pub mod api_response;
pub mod ingest_dto;
pub mod quiz_dto;
