//! AI conversion adapter boundary.
//!
//! The conversion core only needs [`TextGenerator::generate_text`]; the Box
//! AI client, the prompt builder and the response normalizer are the pieces
//! that sit around that call.

pub mod auth;
pub mod box_client;
pub mod error;
pub mod generator;
pub mod normalize;
pub mod prompt;

pub use auth::{AuthMethod, Credentials};
pub use box_client::{BoxAiClient, BoxAiConfig};
pub use error::{AdapterError, Result};
pub use generator::{RecordedCall, ScriptedGenerator, TextGenerator};
pub use normalize::{
    NormalizedResponse, ValidationFeedback, normalize_response, parse_validation,
};
pub use prompt::{Prompt, PromptBuilder};
