//! Prompt construction for the three outbound model calls.

use crate::topic::Topic;

/// Instruction attached to every transcription request. Filler words are kept
/// on purpose: the examiner should see the description as it was spoken.
pub const TRANSCRIPTION_INSTRUCTION: &str =
    "Transcribe este audio en español, incluyendo muletillas.";

/// Natural-language prompt for the topic image: photorealistic, detail-rich,
/// and free of text so the student has to produce all the vocabulary.
pub fn image_prompt(topic: &Topic) -> String {
    format!(
        "Una fotografía realista, clara y educativa sobre el tema: \"{}\". \
         La imagen debe ser rica en detalles, adecuada para que un estudiante \
         de español nivel B2 la describa en un examen. Sin texto en la imagen.",
        topic.title
    )
}

/// Examiner instruction for the evaluation call, embedding the topic title and
/// the student's full accumulated description.
pub fn evaluation_prompt(topic: &Topic, description: &str) -> String {
    format!(
        "Actúa como examinador DELE B2. El alumno describe la imagen del tema \
         \"{}\". Respuesta: \"{}\". Analiza en JSON: correcciones gramaticales, \
         vocabulario sugerido, coherencia y puntuación (0-10) desglosada.",
        topic.title, description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::TopicCatalog;

    #[test]
    fn prompts_embed_topic_and_description() {
        let catalog = TopicCatalog::default();
        let topic = catalog.get("travel").unwrap();

        assert!(image_prompt(topic).contains("Viajes y Turismo"));

        let prompt = evaluation_prompt(topic, "Veo una playa con mucha gente.");
        assert!(prompt.contains("Viajes y Turismo"));
        assert!(prompt.contains("Veo una playa con mucha gente."));
    }
}
