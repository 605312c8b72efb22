// Outgoing messages
#[derive(serde::Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Builds a request with a single user turn made of the given parts.
    pub fn single_turn(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
            generation_config: None,
        }
    }

    /// Constrains the response to a JSON document matching `schema`.
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
        });
        self
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One content part: either text or an inline binary blob, per the
/// `generateContent` wire format.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// An inline media part. `data` must already be base64-encoded.
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

/// Base64-encoded media with its MIME type.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(serde::Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

// Incoming messages
#[derive(serde::Deserialize, Debug, Clone)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    /// The first inline media blob among the response parts, if any.
    pub fn first_inline_data(&self) -> Option<&Blob> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }

    /// All text parts concatenated. Empty when the response carried no text.
    pub fn text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}
