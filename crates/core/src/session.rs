use crate::error::TutorError;
use crate::feedback::Feedback;
use crate::gateway::{AudioClip, ImagePayload, TutorGateway};
use crate::prompts;
use crate::topic::Topic;
use std::sync::Arc;

/// Submitting a description shorter than this is a no-op, not an error.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// The linear practice wizard, as a tagged state rather than ad hoc flags, so
/// invalid combinations cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    TopicSelection,
    GeneratingImage,
    Describing,
    Analyzing,
    Feedback,
}

/// All mutable state for one practice attempt. Owned by the
/// `SessionController`; the presentation layer only reads it.
#[derive(Debug)]
pub struct PracticeSession {
    pub state: SessionState,
    pub selected_topic: Option<Topic>,
    pub generated_image: Option<ImagePayload>,
    pub student_description: String,
    pub feedback: Option<Feedback>,
    pub error: Option<String>,
    pub recording: bool,
    pub transcribing: bool,
    generation: u64,
}

impl PracticeSession {
    fn new() -> Self {
        Self {
            state: SessionState::TopicSelection,
            selected_topic: None,
            generated_image: None,
            student_description: String::new(),
            feedback: None,
            error: None,
            recording: false,
            transcribing: false,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tags an outbound call with the session generation it belongs to. A reset
/// bumps the generation, so results from superseded calls are discarded
/// instead of being applied to a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTag {
    generation: u64,
}

/// Finite-state orchestrator for the practice wizard.
///
/// Every transition that involves the gateway is split into a synchronous
/// `begin_*` step (records intent, returns a `CallTag`) and a synchronous
/// `apply_*` step (folds the call result back into the session). The async
/// methods drive a begin/call/apply cycle end to end; the split keeps the
/// machine fully testable without a network and makes the stale-response
/// guard explicit.
pub struct SessionController<G: TutorGateway> {
    session: PracticeSession,
    gateway: Arc<G>,
}

impl<G: TutorGateway> SessionController<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            session: PracticeSession::new(),
            gateway,
        }
    }

    pub fn session(&self) -> &PracticeSession {
        &self.session
    }

    fn tag(&self) -> CallTag {
        CallTag {
            generation: self.session.generation,
        }
    }

    fn is_stale(&self, tag: CallTag) -> bool {
        tag.generation != self.session.generation
    }

    // --- Topic selection / image generation ---

    /// Enters `GeneratingImage` for the given topic. `None` outside
    /// `TopicSelection`.
    pub fn begin_image_generation(&mut self, topic: Topic) -> Option<CallTag> {
        if self.session.state != SessionState::TopicSelection {
            tracing::warn!(state = ?self.session.state, "Ignoring topic selection");
            return None;
        }
        self.session.error = None;
        self.session.selected_topic = Some(topic);
        self.session.state = SessionState::GeneratingImage;
        Some(self.tag())
    }

    /// Folds the image-generation result back in. On failure the session
    /// reverts to `TopicSelection`: no image exists yet, so there is nothing
    /// to preserve.
    pub fn apply_image_generation(
        &mut self,
        tag: CallTag,
        result: Result<ImagePayload, TutorError>,
    ) {
        if self.is_stale(tag) {
            tracing::debug!("Discarding image result from a superseded session");
            return;
        }
        match result {
            Ok(image) => {
                self.session.generated_image = Some(image);
                self.session.state = SessionState::Describing;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image generation failed");
                self.session.error = Some(e.user_message().to_string());
                self.session.generated_image = None;
                self.session.state = SessionState::TopicSelection;
            }
        }
    }

    /// Full topic-selection transition: prompt, gateway call, state fold.
    pub async fn select_topic(&mut self, topic: Topic) {
        let prompt = prompts::image_prompt(&topic);
        let Some(tag) = self.begin_image_generation(topic) else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let result = gateway.generate_image(&prompt).await;
        self.apply_image_generation(tag, result);
    }

    // --- Recording and transcription ---

    pub fn can_record(&self) -> bool {
        self.session.state == SessionState::Describing
            && !self.session.recording
            && !self.session.transcribing
    }

    /// Marks the microphone as live. Called once the capture adapter has
    /// actually acquired the device. Returns false when recording is not
    /// allowed in the current state.
    pub fn recording_started(&mut self) -> bool {
        if !self.can_record() {
            return false;
        }
        self.session.error = None;
        self.session.recording = true;
        true
    }

    /// Records a capture-side failure (e.g. no microphone granted) as a
    /// user-visible error without touching the rest of the session.
    pub fn capture_failed(&mut self, error: &TutorError) {
        tracing::warn!(error = %error, "Audio capture failed");
        self.session.error = Some(error.user_message().to_string());
        self.session.recording = false;
    }

    /// Flips recording → transcribing. `None` when not recording.
    pub fn begin_transcription(&mut self) -> Option<CallTag> {
        if !self.session.recording {
            return None;
        }
        self.session.recording = false;
        self.session.transcribing = true;
        Some(self.tag())
    }

    /// Folds the transcription result back in. A failure never touches the
    /// already-accumulated description.
    pub fn apply_transcription(&mut self, tag: CallTag, result: Result<String, TutorError>) {
        if self.is_stale(tag) {
            tracing::debug!("Discarding transcription from a superseded session");
            return;
        }
        self.session.transcribing = false;
        match result {
            Ok(text) => self.append_transcript(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Transcription failed");
                self.session.error = Some(e.user_message().to_string());
            }
        }
    }

    /// Transcribed text joins the existing description with a single space;
    /// when nothing has been said yet it replaces it outright.
    fn append_transcript(&mut self, text: &str) {
        if self.session.student_description.is_empty() {
            self.session.student_description = text.to_string();
        } else {
            self.session.student_description.push(' ');
            self.session.student_description.push_str(text);
        }
    }

    /// Full stop-recording transition: hands the assembled clip to the
    /// gateway and folds the transcription back into the description.
    pub async fn transcribe_clip(&mut self, clip: AudioClip) {
        let Some(tag) = self.begin_transcription() else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let result = gateway
            .transcribe(&clip, prompts::TRANSCRIPTION_INSTRUCTION)
            .await;
        self.apply_transcription(tag, result);
    }

    /// Direct edit of the description text, as typed by the student.
    pub fn set_description(&mut self, text: impl Into<String>) {
        if self.session.state == SessionState::Describing {
            self.session.student_description = text.into();
        }
    }

    // --- Evaluation ---

    pub fn can_submit(&self) -> bool {
        self.session.state == SessionState::Describing
            && !self.session.recording
            && !self.session.transcribing
            && self.session.student_description.chars().count() >= MIN_DESCRIPTION_CHARS
    }

    /// Enters `Analyzing` and hands back what the evaluation call needs.
    /// `None` whenever the submit preconditions do not hold.
    pub fn begin_evaluation(&mut self) -> Option<(CallTag, String, ImagePayload)> {
        if !self.can_submit() {
            return None;
        }
        let image = self.session.generated_image.clone()?;
        let topic = self.session.selected_topic.as_ref()?;
        let prompt = prompts::evaluation_prompt(topic, &self.session.student_description);
        self.session.error = None;
        self.session.state = SessionState::Analyzing;
        Some((self.tag(), prompt, image))
    }

    /// Folds the evaluation result back in. A failure reverts to `Describing`
    /// with the student's text preserved byte for byte.
    pub fn apply_evaluation(&mut self, tag: CallTag, result: Result<Feedback, TutorError>) {
        if self.is_stale(tag) {
            tracing::debug!("Discarding evaluation from a superseded session");
            return;
        }
        match result {
            Ok(feedback) => {
                self.session.feedback = Some(feedback);
                self.session.state = SessionState::Feedback;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Evaluation failed");
                self.session.error = Some(e.user_message().to_string());
                self.session.state = SessionState::Describing;
            }
        }
    }

    /// Full submit transition. A no-op below the length threshold or while
    /// recording/transcribing.
    pub async fn submit_description(&mut self) {
        let Some((tag, prompt, image)) = self.begin_evaluation() else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let result = gateway.evaluate(&image, &prompt).await;
        self.apply_evaluation(tag, result);
    }

    // --- Reset ---

    /// Restores the initial session shape and supersedes any in-flight call.
    pub fn reset(&mut self) {
        let generation = self.session.generation + 1;
        self.session = PracticeSession {
            generation,
            ..PracticeSession::new()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockTutorGateway;
    use crate::topic::TopicCatalog;

    fn topic(id: &str) -> Topic {
        TopicCatalog::default().get(id).cloned().expect("known topic")
    }

    fn png() -> ImagePayload {
        ImagePayload {
            mime_type: "image/png".to_string(),
            data: "aW1hZ2U=".to_string(),
        }
    }

    fn sample_feedback_json() -> &'static str {
        r#"{
            "grammarCorrections": [],
            "vocabularySuggestions": ["X"],
            "coherenceCheck": "ok",
            "score": 7,
            "scoreBreakdown": {"grammar": 6, "vocabulary": 8, "coherence": 7},
            "generalAdvice": "Good job"
        }"#
    }

    /// Drives a controller into `Describing` without touching the gateway.
    fn describing(controller: &mut SessionController<MockTutorGateway>) {
        let tag = controller.begin_image_generation(topic("travel")).unwrap();
        controller.apply_image_generation(tag, Ok(png()));
        assert_eq!(controller.session().state, SessionState::Describing);
    }

    fn assert_initial_shape(session: &PracticeSession) {
        assert_eq!(session.state, SessionState::TopicSelection);
        assert!(session.selected_topic.is_none());
        assert!(session.generated_image.is_none());
        assert!(session.student_description.is_empty());
        assert!(session.feedback.is_none());
        assert!(session.error.is_none());
        assert!(!session.recording);
        assert!(!session.transcribing);
    }

    #[tokio::test]
    async fn select_topic_success_reaches_describing() {
        let mut gateway = MockTutorGateway::new();
        gateway
            .expect_generate_image()
            .returning(|_| Box::pin(async { Ok(png()) }))
            .once();

        let mut controller = SessionController::new(Arc::new(gateway));
        controller.select_topic(topic("environment")).await;

        let session = controller.session();
        assert_eq!(session.state, SessionState::Describing);
        assert_eq!(session.generated_image, Some(png()));
        assert_eq!(
            session.selected_topic.as_ref().map(|t| t.id.as_str()),
            Some("environment")
        );
        assert!(session.error.is_none());
    }

    #[tokio::test]
    async fn select_topic_failure_reverts_to_topic_selection() {
        let mut gateway = MockTutorGateway::new();
        gateway
            .expect_generate_image()
            .returning(|_| {
                Box::pin(async {
                    Err(TutorError::GenerationFailure("no inline image".to_string()))
                })
            })
            .once();

        let mut controller = SessionController::new(Arc::new(gateway));
        controller.select_topic(topic("environment")).await;

        let session = controller.session();
        assert_eq!(session.state, SessionState::TopicSelection);
        assert!(session.generated_image.is_none());
        assert_eq!(
            session.error.as_deref(),
            Some("Error generando la imagen. Por favor intenta de nuevo.")
        );
    }

    #[tokio::test]
    async fn submit_is_noop_below_length_threshold() {
        let mut gateway = MockTutorGateway::new();
        gateway.expect_evaluate().never();

        let mut controller = SessionController::new(Arc::new(gateway));
        describing(&mut controller);
        controller.set_description("corto"); // 5 chars, below 10

        assert!(!controller.can_submit());
        controller.submit_description().await;
        assert_eq!(controller.session().state, SessionState::Describing);
    }

    #[tokio::test]
    async fn submit_is_noop_while_recording() {
        let mut gateway = MockTutorGateway::new();
        gateway.expect_evaluate().never();

        let mut controller = SessionController::new(Arc::new(gateway));
        describing(&mut controller);
        controller.set_description("una descripción suficientemente larga");
        assert!(controller.recording_started());

        assert!(!controller.can_submit());
        controller.submit_description().await;
        assert_eq!(controller.session().state, SessionState::Describing);
        assert!(controller.session().recording);
    }

    #[tokio::test]
    async fn evaluation_success_populates_feedback() {
        let mut gateway = MockTutorGateway::new();
        gateway
            .expect_evaluate()
            .returning(|_, _| Box::pin(async { Feedback::from_json(sample_feedback_json()) }))
            .once();

        let mut controller = SessionController::new(Arc::new(gateway));
        describing(&mut controller);
        controller.set_description("Veo una playa con mucha gente tomando el sol.");
        controller.submit_description().await;

        let session = controller.session();
        assert_eq!(session.state, SessionState::Feedback);
        let feedback = session.feedback.as_ref().expect("feedback populated");
        assert_eq!(feedback.score, 7.0);
        assert_eq!(feedback.score_breakdown.vocabulary, 8.0);
        assert_eq!(feedback.vocabulary_suggestions, vec!["X".to_string()]);
        assert_eq!(feedback.coherence_check, "ok");
        assert_eq!(feedback.general_advice, "Good job");
    }

    #[tokio::test]
    async fn evaluation_failure_preserves_description() {
        let mut gateway = MockTutorGateway::new();
        gateway
            .expect_evaluate()
            .returning(|_, _| {
                Box::pin(async { Feedback::from_json("{ this is not the schema") })
            })
            .once();

        let mut controller = SessionController::new(Arc::new(gateway));
        describing(&mut controller);
        let text = "Veo una playa con mucha gente tomando el sol.";
        controller.set_description(text);
        controller.submit_description().await;

        let session = controller.session();
        assert_eq!(session.state, SessionState::Describing);
        assert_eq!(session.student_description, text);
        assert_eq!(session.error.as_deref(), Some("Error al analizar la respuesta."));
    }

    #[test]
    fn transcription_failure_preserves_description_exactly() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        describing(&mut controller);
        controller.set_description("tengo");
        assert!(controller.recording_started());

        let tag = controller.begin_transcription().unwrap();
        assert!(controller.session().transcribing);
        assert!(!controller.session().recording);

        controller.apply_transcription(
            tag,
            Err(TutorError::TranscriptionFailure("timeout".to_string())),
        );

        let session = controller.session();
        assert_eq!(session.student_description, "tengo");
        assert!(!session.transcribing);
        assert_eq!(session.error.as_deref(), Some("Error al transcribir."));
    }

    #[test]
    fn transcript_concatenation_rule() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        describing(&mut controller);

        // Appending to an empty description replaces it, no leading space.
        assert!(controller.recording_started());
        let tag = controller.begin_transcription().unwrap();
        controller.apply_transcription(tag, Ok("hola".to_string()));
        assert_eq!(controller.session().student_description, "hola");

        // Appending to existing text inserts exactly one separating space.
        controller.set_description("tengo");
        assert!(controller.recording_started());
        let tag = controller.begin_transcription().unwrap();
        controller.apply_transcription(tag, Ok("hola".to_string()));
        assert_eq!(controller.session().student_description, "tengo hola");
    }

    #[test]
    fn reset_restores_initial_shape_from_any_state() {
        // From Describing with accumulated text and a stale error.
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        describing(&mut controller);
        controller.set_description("algo escrito");
        controller.capture_failed(&TutorError::DeviceUnavailable("none".to_string()));
        controller.reset();
        assert_initial_shape(controller.session());

        // From Feedback.
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        describing(&mut controller);
        controller.set_description("una descripción suficientemente larga");
        let (tag, _, _) = controller.begin_evaluation().unwrap();
        controller.apply_evaluation(tag, Feedback::from_json(sample_feedback_json()));
        assert_eq!(controller.session().state, SessionState::Feedback);
        controller.reset();
        assert_initial_shape(controller.session());

        // Reset is idempotent, including from the initial state.
        controller.reset();
        assert_initial_shape(controller.session());
    }

    #[test]
    fn stale_image_result_is_discarded_after_reset() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        let tag = controller.begin_image_generation(topic("health")).unwrap();
        controller.reset();

        // The pending call resolves against a superseded generation.
        controller.apply_image_generation(tag, Ok(png()));
        assert_initial_shape(controller.session());
    }

    #[test]
    fn stale_transcription_is_discarded_after_reset() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        describing(&mut controller);
        assert!(controller.recording_started());
        let tag = controller.begin_transcription().unwrap();
        controller.reset();

        controller.apply_transcription(tag, Ok("texto fantasma".to_string()));
        assert_initial_shape(controller.session());
    }

    #[test]
    fn error_is_cleared_when_a_new_attempt_begins() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        let tag = controller.begin_image_generation(topic("work")).unwrap();
        controller.apply_image_generation(
            tag,
            Err(TutorError::GenerationFailure("empty".to_string())),
        );
        assert!(controller.session().error.is_some());

        // The error survives until the user retries, then clears.
        let _ = controller.begin_image_generation(topic("work")).unwrap();
        assert!(controller.session().error.is_none());
    }

    #[test]
    fn recording_is_rejected_outside_describing() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        assert!(!controller.can_record());
        assert!(!controller.recording_started());
        assert!(controller.begin_transcription().is_none());
    }

    #[test]
    fn recording_and_transcribing_are_mutually_exclusive() {
        let mut controller = SessionController::new(Arc::new(MockTutorGateway::new()));
        describing(&mut controller);
        assert!(controller.recording_started());
        // A second start while the microphone is live is rejected.
        assert!(!controller.recording_started());

        let tag = controller.begin_transcription().unwrap();
        let session = controller.session();
        assert!(session.transcribing && !session.recording);
        // And no new recording can start while transcription is in flight.
        assert!(!controller.can_record());

        controller.apply_transcription(tag, Ok(String::new()));
        assert!(!controller.session().transcribing);
    }
}
