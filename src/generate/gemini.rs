use rootcause::Report;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::result::MapIntoReport;
use crate::settings::GeneratorSettings;

use super::{GenerateError, GenerateResult, SqlGenerator};

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        }
    }
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, trimmed.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_owned())
    }
}

impl GeminiClient {
    pub fn new(settings: &GeneratorSettings) -> Result<Self, GenerateError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(GenerateError::ApiKeyMissing)?;

        Ok(Self {
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                settings.base_url.trim_end_matches('/'),
                settings.model
            ),
            api_key,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SqlGenerator for GeminiClient {
    #[instrument(skip_all)]
    async fn sql_generate(&self, prompt: &str) -> GenerateResult<String> {
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_into_report::<GenerateError>()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Report::new(GenerateError::Status {
                status: status.as_u16(),
            }));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_into_report::<GenerateError>()?;
        let text = body.text().ok_or(GenerateError::EmptyResponse)?;
        debug!("generated {} bytes of SQL text", text.len());
        Ok(text)
    }
}
