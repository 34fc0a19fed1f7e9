//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod access_token_repo;
pub mod connected_server_repo;
pub mod import_job_repo;
pub mod invitation_repo;
pub mod library_repo;
pub mod user_repo;

pub use access_token_repo::AccessTokenRepo;
pub use connected_server_repo::ConnectedServerRepo;
pub use import_job_repo::ImportJobRepo;
pub use invitation_repo::InvitationRepo;
pub use library_repo::LibraryRepo;
pub use user_repo::UserRepo;
