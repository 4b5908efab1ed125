// Utility functions
pub mod error;
pub mod slug;

pub use error::*;
pub use slug::*;
