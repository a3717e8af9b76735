pub mod draft_handlers;
pub mod form;
pub mod health_handlers;
pub mod media_handlers;
pub mod page_handlers;
