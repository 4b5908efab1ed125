pub mod account;
pub mod applicant;
pub mod job;

pub use account::*;
pub use applicant::*;
pub use job::*;
