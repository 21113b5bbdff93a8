pub mod guard;
pub mod orders;

pub use guard::SubmissionGuard;
pub use orders::OrderService;
