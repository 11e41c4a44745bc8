pub mod metadata;
pub mod storage_service;
