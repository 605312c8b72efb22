use crate::error::TutorError;
use crate::feedback::{self, Feedback};
use anyhow::Result;
use async_trait::async_trait;
use base64::Engine as _;
#[cfg(test)]
use mockall::automock;
use secrecy::SecretString;

use gemini_generate::types::{GenerateContentRequest, Part};

/// A generated image as delivered by the model: base64 payload plus its MIME
/// type. Kept encoded because it is re-sent verbatim with the evaluation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    /// Decodes the payload into raw bytes, e.g. to write it to disk.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.data)?)
    }
}

/// One captured audio clip, ready for transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub mime_type: String,
    pub data: Vec<u8>,
}

// The `TutorGateway` trait is the narrow seam between the session controller
// and the external generative service: three request/response operations,
// nothing else. Unit tests substitute `MockTutorGateway` (generated by
// `mockall`) so every state transition can be exercised without the network.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait TutorGateway: Send + Sync {
    /// Generates the practice image for the given prompt.
    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload, TutorError>;

    /// Transcribes a captured clip. An empty transcription is valid.
    async fn transcribe(&self, clip: &AudioClip, instruction: &str)
    -> Result<String, TutorError>;

    /// Evaluates the student's description of the image against the fixed
    /// feedback schema.
    async fn evaluate(
        &self,
        image: &ImagePayload,
        instruction: &str,
    ) -> Result<Feedback, TutorError>;
}

/// The production gateway: marshals the three operations onto the Gemini
/// `generateContent` endpoint.
pub struct GeminiGateway {
    client: gemini_generate::Client,
    image_model: String,
    chat_model: String,
}

impl GeminiGateway {
    pub fn new(api_key: SecretString, image_model: String, chat_model: String) -> Self {
        Self {
            client: gemini_generate::Client::new(api_key),
            image_model,
            chat_model,
        }
    }
}

#[async_trait]
impl TutorGateway for GeminiGateway {
    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload, TutorError> {
        let request = GenerateContentRequest::single_turn(vec![Part::text(prompt)]);

        let response = self
            .client
            .generate_content(&self.image_model, &request)
            .await
            .map_err(|e| TutorError::GenerationFailure(e.to_string()))?;

        // The model may interleave text parts; only an inline image counts.
        let blob = response
            .first_inline_data()
            .ok_or_else(|| {
                TutorError::GenerationFailure("response contained no inline image".to_string())
            })?;

        Ok(ImagePayload {
            mime_type: blob.mime_type.clone(),
            data: blob.data.clone(),
        })
    }

    async fn transcribe(
        &self,
        clip: &AudioClip,
        instruction: &str,
    ) -> Result<String, TutorError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&clip.data);
        let request = GenerateContentRequest::single_turn(vec![
            Part::inline_data(clip.mime_type.clone(), encoded),
            Part::text(instruction),
        ]);

        let response = self
            .client
            .generate_content(&self.chat_model, &request)
            .await
            .map_err(|e| TutorError::TranscriptionFailure(e.to_string()))?;

        // Best effort: an empty string is a valid transcription result.
        Ok(response.text())
    }

    async fn evaluate(
        &self,
        image: &ImagePayload,
        instruction: &str,
    ) -> Result<Feedback, TutorError> {
        let request = GenerateContentRequest::single_turn(vec![
            Part::inline_data(image.mime_type.clone(), image.data.clone()),
            Part::text(instruction),
        ])
        .with_json_schema(feedback::response_schema());

        let response = self
            .client
            .generate_content(&self.chat_model, &request)
            .await
            .map_err(|e| TutorError::EvaluationFailure(e.to_string()))?;

        Feedback::from_json(&response.text())
    }
}
