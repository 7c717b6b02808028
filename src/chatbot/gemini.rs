//! Gemini API client: model auto-discovery and `generateContent` invocation.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chatbot::history::{Turn, TurnPayload};
use crate::chatbot::persona::AUDIO_FOLLOW_UP;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Used whenever discovery fails or returns nothing usable.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Preferred models, best first.
const MODEL_PREFERENCES: [&str; 3] = ["gemini-2.5-flash", "gemini-1.5-pro", "gemini-1.5-flash"];

/// Failure modes of one model invocation. Never retried; the engine turns
/// these into reply text for the user.
#[derive(Debug)]
pub enum GeminiError {
    /// Non-2xx HTTP response from the provider.
    Provider { status: u16, body: String },
    /// Connection, body-read, or JSON failure - including a 2xx response
    /// missing the expected reply text path.
    Transport(String),
}

impl fmt::Display for GeminiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { status, body } => write!(f, "Google error ({status}): {body}"),
            Self::Transport(msg) => write!(f, "Connection error: {msg}"),
        }
    }
}

impl std::error::Error for GeminiError {}

// --- wire types ---

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Deserialize)]
struct ListedModel {
    name: String,
}

/// Gemini HTTP client. The model name is resolved once at startup and is
/// immutable afterwards.
///
/// No request timeout is configured: a stalled provider call blocks that
/// user's turn until the connection dies.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Query the models listing once and lock in the best available name.
    ///
    /// Any failure (transport, non-2xx, unparsable body) silently falls back
    /// to [`DEFAULT_MODEL`]. No retries.
    pub async fn discover_model(&mut self) {
        info!("🔍 Querying available models...");
        let url = format!("{GEMINI_API_BASE}/models?key={}", self.api_key);

        let names = match self.list_model_names(&url).await {
            Ok(names) => names,
            Err(e) => {
                warn!("Model discovery failed, using {DEFAULT_MODEL}: {e}");
                self.model = DEFAULT_MODEL.to_string();
                return;
            }
        };

        self.model = pick_model(&names).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        info!("🔥 Using model: {}", self.model);
    }

    async fn list_model_names(&self, url: &str) -> Result<Vec<String>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("listing request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("listing returned {}", response.status()));
        }

        let listing: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse listing: {e}"))?;

        Ok(listing
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    /// Send one `generateContent` request and return the reply text.
    pub async fn generate(&self, turns: &[Turn]) -> Result<String, GeminiError> {
        let request = GenerateRequest {
            contents: turns.iter().map(turn_to_content).collect(),
        };

        let url = format!(
            "{GEMINI_API_BASE}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GeminiError::Transport(format!("failed to read response: {e}")))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GeminiError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        extract_reply(&body)
    }
}

/// Convert one stored turn to its wire form. Audio turns carry a trailing
/// instruction part so the model treats the recording as student speech.
fn turn_to_content(turn: &Turn) -> Content {
    let parts = match &turn.payload {
        TurnPayload::Text(text) => vec![Part::text(text.clone())],
        TurnPayload::Audio { mime_type, data } => vec![
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
            },
            Part::text(AUDIO_FOLLOW_UP),
        ],
    };

    Content {
        role: turn.role.as_str(),
        parts,
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a 2xx body.
/// Absence of that path is a transport-class failure (malformed success).
fn extract_reply(body: &str) -> Result<String, GeminiError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GeminiError::Transport(format!("failed to parse response: {e}")))?;

    parsed
        .candidates
        .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .and_then(|mut p| if p.is_empty() { None } else { Some(p.remove(0)) })
        .and_then(|p| p.text)
        .ok_or_else(|| GeminiError::Transport("no reply text in response".to_string()))
}

/// Pick the best model name from a listing: the preference list in order,
/// then any "flash" model that is not a 2.0, then nothing.
fn pick_model(names: &[String]) -> Option<String> {
    for pref in MODEL_PREFERENCES {
        if names.iter().any(|n| n == pref) {
            return Some(pref.to_string());
        }
    }

    names
        .iter()
        .find(|n| n.contains("flash") && !n.contains("2.0"))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::history::Role;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_prefers_ordered_list() {
        let available = names(&["gemini-1.5-flash", "gemini-2.5-flash", "gemini-1.5-pro"]);
        assert_eq!(pick_model(&available).as_deref(), Some("gemini-2.5-flash"));

        let available = names(&["gemini-1.5-flash", "gemini-1.5-pro"]);
        assert_eq!(pick_model(&available).as_deref(), Some("gemini-1.5-pro"));
    }

    #[test]
    fn test_pick_falls_back_to_non_20_flash() {
        let available = names(&["gemini-2.0-flash", "gemini-exp-flash-lite", "gemini-ultra"]);
        assert_eq!(
            pick_model(&available).as_deref(),
            Some("gemini-exp-flash-lite")
        );
    }

    #[test]
    fn test_pick_returns_none_when_nothing_matches() {
        let available = names(&["gemini-2.0-flash", "gemini-ultra"]);
        assert_eq!(pick_model(&available), None);
        assert_eq!(pick_model(&[]), None);
    }

    #[test]
    fn test_extract_reply_happy_path() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Well done!"}], "role": "model"}}
            ]
        }"#;
        assert_eq!(extract_reply(body).unwrap(), "Well done!");
    }

    #[test]
    fn test_extract_reply_malformed_success_is_transport_error() {
        for body in [
            "{}",
            r#"{"candidates": []}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {}}]}"#,
        ] {
            let err = extract_reply(body).unwrap_err();
            assert!(matches!(err, GeminiError::Transport(_)), "body: {body}");
        }

        let err = extract_reply("not json at all").unwrap_err();
        assert!(matches!(err, GeminiError::Transport(_)));
    }

    #[test]
    fn test_provider_error_display_carries_status_and_body() {
        let err = GeminiError::Provider {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("quota exceeded"));
    }

    #[test]
    fn test_audio_turn_serializes_inline_data_with_trailing_instruction() {
        let turn = Turn::user_audio("audio/ogg", "AAAA");
        let content = turn_to_content(&turn);
        assert_eq!(content.role, "user");
        assert_eq!(content.parts.len(), 2);

        let json = serde_json::to_value(GenerateRequest {
            contents: vec![content],
        })
        .unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "audio/ogg");
        assert_eq!(parts[0]["inline_data"]["data"], "AAAA");
        assert_eq!(parts[1]["text"], AUDIO_FOLLOW_UP);
        // Text parts must not serialize a null inline_data and vice versa.
        assert!(parts[1].get("inline_data").is_none());
        assert!(parts[0].get("text").is_none());
    }

    #[test]
    fn test_text_turn_serializes_role_and_text() {
        let turn = Turn {
            role: Role::Model,
            payload: TurnPayload::Text("ok".to_string()),
        };
        let json = serde_json::to_value(turn_to_content(&turn)).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["parts"][0]["text"], "ok");
    }
}
