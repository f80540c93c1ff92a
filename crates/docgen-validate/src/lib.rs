//! Validation of converted Box DocGen templates.
//!
//! - **syntax**: delimiter and block-helper balance, helper names
//! - **semantic**: field references checked against an optional schema
//! - **quality**: residual legacy syntax and content loss versus the original
//! - **engine**: combines the checks, or delegates to an AI validator

mod expression;

pub mod engine;
pub mod quality;
pub mod semantic;
pub mod syntax;

pub use engine::Validator;
pub use quality::check_conversion_quality;
pub use semantic::{check_semantics, field_references};
pub use syntax::{CORE_HELPERS, HelperSet, check_syntax};
