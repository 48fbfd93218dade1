use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{FeedbackError, RemoteConfig, TTS_PATH};

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechResponse {
    audio_content: Option<String>,
}

/// Client for the remote text-to-speech endpoint.
#[derive(Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
}

impl SpeechClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Synthesizes a voice message and returns the decoded mp3 bytes.
    pub async fn synthesize(&self, config: &RemoteConfig, text: &str) -> Result<Vec<u8>, FeedbackError> {
        if config.base_url.is_empty() || config.api_key.is_empty() {
            return Err(FeedbackError::Configuration("Speech endpoint not configured".to_string()));
        }

        let url = format!("{}{}", config.base_url, TTS_PATH);
        let request = SpeechRequest {
            text,
            voice: &config.voice,
            speed: config.speed,
        };

        tracing::debug!("Requesting speech synthesis from {}", url);

        let response = self.client
            .post(&url)
            .header("apikey", &config.api_key)
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| FeedbackError::Speech(format!("Speech request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(FeedbackError::Speech(format!("Speech endpoint returned {}", response.status())));
        }

        let body: SpeechResponse = response
            .json()
            .await
            .map_err(|err| FeedbackError::Speech(format!("Failed to decode speech response: {err}")))?;

        let Some(audio_content) = body.audio_content else {
            return Err(FeedbackError::Speech("Speech response had no audio content".to_string()));
        };

        base64::engine::general_purpose::STANDARD
            .decode(audio_content)
            .map_err(|err| FeedbackError::Speech(format!("Audio content was not valid base64: {err}")))
    }
}

#[tokio::test]
async fn missing_configuration_is_reported_not_requested() {
    let client = SpeechClient::new(reqwest::Client::new());
    let config = RemoteConfig {
        base_url: String::new(),
        api_key: String::new(),
        user_token: String::new(),
        voice: "alloy".to_string(),
        speed: 1.0,
    };

    let result = client.synthesize(&config, "olá").await;
    assert!(matches!(result, Err(FeedbackError::Configuration(_))));
}

#[test]
fn request_wire_format() {
    let request = SpeechRequest { text: "olá", voice: "alloy", speed: 1.0 };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json, serde_json::json!({"text": "olá", "voice": "alloy", "speed": 1.0}));
}

#[test]
fn response_accepts_missing_audio_content() {
    let body: SpeechResponse = serde_json::from_str("{\"error\":\"rate limited\"}").unwrap();
    assert!(body.audio_content.is_none());

    let body: SpeechResponse = serde_json::from_str("{\"audioContent\":\"aGVsbG8=\"}").unwrap();
    assert_eq!(body.audio_content.as_deref(), Some("aGVsbG8="));
}
