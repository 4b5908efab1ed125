pub mod applicants;
pub mod health;
pub mod swagger;
