pub mod api_key_repo;
pub mod file_repo;
pub mod object_repo;
pub mod registration_repo;
pub mod submission_repo;
pub mod token_repo;

pub use api_key_repo::{ApiKeyRepository, NewApiKey};
pub use file_repo::{FileRepository, NewFile};
pub use object_repo::{NewObject, ObjectRepository};
pub use registration_repo::{NewRegistration, RegistrationRepository};
pub use submission_repo::{NewSubmission, SubmissionPatch, SubmissionRepository};
pub use token_repo::TokenRepository;
