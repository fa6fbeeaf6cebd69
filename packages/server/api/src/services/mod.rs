pub mod auth_service;
pub mod object_service;
pub mod project_service;
pub mod publish;
pub mod submission_service;
