//! Business services called by the HTTP handlers

pub mod certificates;
pub mod departments;
pub mod programs;
pub mod seeder;
pub mod users;

pub use certificates::{CertificateService, UploadedFile, DEFAULT_MAX_UPLOAD_BYTES};
pub use departments::DepartmentService;
pub use programs::ProgramService;
pub use seeder::{ensure_admin, SeedOutcome, DEFAULT_SEED_PASSWORD, SEED_ADMIN_EMAIL};
pub use users::{NewAccount, UserService};
