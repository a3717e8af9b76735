pub mod backend;
pub mod draft_repository;
pub mod draft_workflow;
pub mod media_store;
