pub mod chat_handlers;
pub mod email_handlers;
pub mod event_handlers;
pub mod insights_handlers;
pub mod registration_handlers;
pub mod skill_handlers;
pub mod task_handlers;
pub mod volunteer_handlers;
