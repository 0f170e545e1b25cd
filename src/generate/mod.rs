//! Natural-language to SQL generation.
//!
//! The generator is a seam: the service only needs something that turns a
//! prompt into text. [`GeminiClient`] is the production implementation.

use std::future::Future;

use error_set::error_set;
use rootcause::Report;

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;
pub use prompt::{INCOMPLETE_MESSAGE, input_incomplete, prompt_build};

error_set! {
    GenerateError = {
        #[display("Generator API key not configured")]
        ApiKeyMissing,
        #[display("Generator returned HTTP status {status}")]
        Status { status: u16 },
        #[display("Generator returned no SQL text")]
        EmptyResponse,
        Http(reqwest::Error),
    };
}

pub type GenerateResult<T> = Result<T, Report<GenerateError>>;

/// Produces raw model output (possibly fenced SQL) for a prompt.
pub trait SqlGenerator {
    fn sql_generate(&self, prompt: &str) -> impl Future<Output = GenerateResult<String>> + Send;
}
