/// Failure taxonomy for the practice session.
///
/// Every variant is recovered at the session-controller boundary: it becomes a
/// short user-facing message and the session reverts to a well-defined prior
/// state. None of these are fatal; the triggering action can always be retried.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    #[error("image generation returned no image payload: {0}")]
    GenerationFailure(String),

    #[error("no usable microphone: {0}")]
    DeviceUnavailable(String),

    #[error("audio transcription failed: {0}")]
    TranscriptionFailure(String),

    #[error("evaluation failed or did not match the expected schema: {0}")]
    EvaluationFailure(String),
}

impl TutorError {
    /// The short Spanish message shown to the student.
    pub fn user_message(&self) -> &'static str {
        match self {
            TutorError::GenerationFailure(_) => {
                "Error generando la imagen. Por favor intenta de nuevo."
            }
            TutorError::DeviceUnavailable(_) => "No se detectó micrófono.",
            TutorError::TranscriptionFailure(_) => "Error al transcribir.",
            TutorError::EvaluationFailure(_) => "Error al analizar la respuesta.",
        }
    }
}
