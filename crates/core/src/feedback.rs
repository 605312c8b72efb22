use crate::error::TutorError;
use serde::{Deserialize, Serialize};

/// The structured evaluation returned by the examiner model.
///
/// Field names are camelCase on the wire, so the model's JSON deserializes
/// directly into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub grammar_corrections: Vec<GrammarCorrection>,
    pub vocabulary_suggestions: Vec<String>,
    pub coherence_check: String,
    /// Overall mark in [0, 10].
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub general_advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarCorrection {
    pub error: String,
    pub correction: String,
    pub explanation: String,
}

/// Per-axis marks, each in [0, 10].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub grammar: f64,
    pub vocabulary: f64,
    pub coherence: f64,
}

impl Feedback {
    /// Parses the raw model output. Anything that does not conform to the
    /// requested schema is an `EvaluationFailure`.
    pub fn from_json(text: &str) -> Result<Self, TutorError> {
        serde_json::from_str(text).map_err(|e| TutorError::EvaluationFailure(e.to_string()))
    }
}

/// The fixed `responseSchema` sent with every evaluation request. The model
/// is constrained to produce a JSON object that `Feedback::from_json` accepts.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "grammarCorrections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "error": { "type": "STRING" },
                        "correction": { "type": "STRING" },
                        "explanation": { "type": "STRING" }
                    }
                }
            },
            "vocabularySuggestions": { "type": "ARRAY", "items": { "type": "STRING" } },
            "coherenceCheck": { "type": "STRING" },
            "score": { "type": "NUMBER" },
            "scoreBreakdown": {
                "type": "OBJECT",
                "properties": {
                    "grammar": { "type": "NUMBER" },
                    "vocabulary": { "type": "NUMBER" },
                    "coherence": { "type": "NUMBER" }
                }
            },
            "generalAdvice": { "type": "STRING" }
        }
    })
}
