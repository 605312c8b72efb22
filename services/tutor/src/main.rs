mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use dele_capture::{CaptureError, MicCapture};
use dele_core::TutorError;
use dele_core::feedback::Feedback;
use dele_core::gateway::GeminiGateway;
use dele_core::session::{MIN_DESCRIPTION_CHARS, SessionController, SessionState};
use dele_core::topic::{Topic, TopicCatalog};
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Terminal wizard for DELE B2 oral-exam practice.
#[derive(Parser)]
struct Cli {
    /// Topic id to preselect (skips the topic menu)
    #[arg(long)]
    topic: Option<String>,

    /// Where the generated practice image is written
    #[arg(long, default_value = "practice-image.png")]
    image_out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Application Setup ---
    let catalog = TopicCatalog::default();
    let gateway = Arc::new(GeminiGateway::new(
        config.gemini_api_key.clone(),
        config.image_model.clone(),
        config.chat_model.clone(),
    ));
    let mut controller = SessionController::new(gateway);
    // The live microphone capture, if any. Held on the main task because the
    // cpal stream is not Send.
    let mut capture: Option<MicCapture> = None;
    let mut preselected = args.topic.clone();

    println!("== DELE Tutor B2 — práctica del examen oral ==\n");

    loop {
        if let Some(message) = controller.session().error.as_deref() {
            println!("⚠ {message}\n");
        }

        match controller.session().state {
            SessionState::TopicSelection => {
                let topic = match preselected.take() {
                    Some(id) => catalog
                        .get(&id)
                        .cloned()
                        .with_context(|| format!("Unknown topic id: {id}"))?,
                    None => match prompt_topic(&catalog)? {
                        Some(topic) => topic,
                        None => break,
                    },
                };

                println!("Creando imagen sobre \"{}\"...", topic.title);
                controller.select_topic(topic).await;

                if let Some(image) = &controller.session().generated_image {
                    let bytes = image.decode().context("Generated image is not valid base64")?;
                    std::fs::write(&args.image_out, bytes)
                        .with_context(|| format!("Failed to write {}", args.image_out.display()))?;
                    println!("Imagen guardada en {}\n", args.image_out.display());
                }
            }
            SessionState::Describing => {
                describe_step(&mut controller, &mut capture).await?;
            }
            SessionState::Feedback => {
                if let Some(feedback) = &controller.session().feedback {
                    render_feedback(feedback);
                }
                match read_line("¿Practicar otro tema? (s/n) ")? {
                    Some(answer) if answer.eq_ignore_ascii_case("s") => controller.reset(),
                    _ => break,
                }
            }
            // Transient states: the async drivers resolve them before the
            // loop observes the session again.
            SessionState::GeneratingImage | SessionState::Analyzing => {}
        }
    }

    println!("¡Hasta pronto!");
    Ok(())
}

/// One round of the describing view: prints the prompt material and handles
/// a single line of input (text or a `/` command).
async fn describe_step(
    controller: &mut SessionController<GeminiGateway>,
    capture: &mut Option<MicCapture>,
) -> Result<()> {
    let session = controller.session();
    if let Some(topic) = &session.selected_topic {
        println!("Tema: {} {}", topic.icon, topic.title);
        println!("Ayuda (vocabulario): {}", topic.vocabulary.join(", "));
    }
    if !session.student_description.is_empty() {
        println!("\nTu descripción ({} caracteres):", session.student_description.chars().count());
        println!("  {}", session.student_description);
    }
    println!(
        "\nEscribe tu descripción, o usa /grabar, /parar, /enviar (mínimo {} caracteres), /reiniciar, /salir",
        MIN_DESCRIPTION_CHARS
    );

    let state_label = if session.recording {
        "[grabando] "
    } else if session.transcribing {
        "[procesando] "
    } else {
        ""
    };
    let Some(line) = read_line(&format!("{state_label}> "))? else {
        // EOF: treat like /salir.
        std::process::exit(0);
    };

    match line.as_str() {
        "" => {}
        "/grabar" => {
            if !controller.can_record() {
                println!("Ahora mismo no se puede grabar.");
            } else {
                match MicCapture::start() {
                    Ok(mic) => {
                        *capture = Some(mic);
                        controller.recording_started();
                        println!("Grabando... usa /parar para terminar.");
                    }
                    Err(e) => controller.capture_failed(&capture_error(e)),
                }
            }
        }
        "/parar" => match capture.take() {
            Some(mic) => match mic.stop() {
                Ok(clip) => {
                    println!("Procesando audio...");
                    controller.transcribe_clip(clip).await;
                }
                Err(e) => controller.capture_failed(&capture_error(e)),
            },
            None => println!("No hay ninguna grabación activa."),
        },
        "/enviar" => {
            if controller.can_submit() {
                println!("Analizando tu respuesta...");
                controller.submit_description().await;
            } else {
                println!(
                    "Para enviar necesitas al menos {} caracteres y no estar grabando.",
                    MIN_DESCRIPTION_CHARS
                );
            }
        }
        "/reiniciar" => {
            // Discard any live capture; the stream is released on drop.
            *capture = None;
            controller.reset();
        }
        "/salir" => std::process::exit(0),
        text => {
            let mut description = controller.session().student_description.clone();
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(text);
            controller.set_description(description);
        }
    }

    println!();
    Ok(())
}

fn prompt_topic(catalog: &TopicCatalog) -> Result<Option<Topic>> {
    println!("Selecciona un tema para generar una imagen y practicar:\n");
    for (i, topic) in catalog.all().iter().enumerate() {
        println!("  {}. {} {} — {}", i + 1, topic.icon, topic.title, topic.description);
    }

    loop {
        let Some(line) = read_line("\nTema (número, o \"salir\"): ")? else {
            return Ok(None);
        };
        if line.eq_ignore_ascii_case("salir") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=catalog.all().len()).contains(&n) => {
                return Ok(Some(catalog.all()[n - 1].clone()));
            }
            _ => println!("Opción no válida."),
        }
    }
}

fn render_feedback(feedback: &Feedback) {
    println!("\n===== Feedback =====");
    println!("Nota global: {}/10", feedback.score);
    println!("  Gramática   {}", score_bar(feedback.score_breakdown.grammar));
    println!("  Vocabulario {}", score_bar(feedback.score_breakdown.vocabulary));
    println!("  Coherencia  {}", score_bar(feedback.score_breakdown.coherence));

    println!("\nCorrecciones:");
    if feedback.grammar_corrections.is_empty() {
        println!("  ¡Perfecto! No hay errores graves.");
    } else {
        for correction in &feedback.grammar_corrections {
            println!("  ✗ {}  →  ✓ {}", correction.error, correction.correction);
            println!("    {}", correction.explanation);
        }
    }

    if !feedback.vocabulary_suggestions.is_empty() {
        println!("\nVocabulario recomendado: {}", feedback.vocabulary_suggestions.join(", "));
    }

    println!("\nCoherencia: {}", feedback.coherence_check);
    println!("Consejo general: {}\n", feedback.general_advice);
}

fn score_bar(score: f64) -> String {
    let filled = score.round().clamp(0.0, 10.0) as usize;
    format!("{}{} {score}/10", "█".repeat(filled), "░".repeat(10 - filled))
}

fn capture_error(error: CaptureError) -> TutorError {
    match error {
        CaptureError::NoDevice | CaptureError::Config(_) | CaptureError::Stream(_) => {
            TutorError::DeviceUnavailable(error.to_string())
        }
        CaptureError::Encode(_) => TutorError::TranscriptionFailure(error.to_string()),
    }
}

fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
