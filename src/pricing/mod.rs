//! Price Resolution Module
//!
//! Core data model and fallback logic for provider price checks:
//! typed fetch results, the deal/outcome types, and the resolver that
//! downgrades a failed live fetch to catalog data instead of an error.

pub mod error;
pub mod provider;
pub mod resolver;
pub mod types;

pub use error::{FailureCategory, FetchErrorKind};
pub use provider::PriceProvider;
pub use resolver::FallbackResolver;
pub use types::*;
