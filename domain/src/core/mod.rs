//! Core domain concepts shared across all subdomains.
//!
//! - [`mode::ChatMode`]: question-answering mode selected by the user
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod mode;
