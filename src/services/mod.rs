pub mod applicant_service;
pub mod matching_service;
pub mod store;

pub use matching_service::*;
pub use store::*;
