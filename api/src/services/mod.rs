pub mod error;
pub mod fetch;
