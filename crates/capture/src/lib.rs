//! Microphone capture adapter.
//!
//! Wraps the host's default input device behind a start/stop pair: `start`
//! arms chunk collection, `stop` consumes the capture and assembles every
//! collected sample into a single WAV payload. The device stream is released
//! when capture stops, whatever happens to the payload afterwards.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use dele_core::gateway::AudioClip;
use std::sync::{Arc, Mutex};

pub const WAV_MIME: &str = "audio/wav";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,

    #[error("failed to configure input device: {0}")]
    Config(String),

    #[error("failed to open input stream: {0}")]
    Stream(String),

    #[error("wav encoding failed: {0}")]
    Encode(String),
}

/// A live microphone capture. Dropping it (or calling `stop`) closes the
/// input stream and releases the device.
pub struct MicCapture {
    stream: cpal::Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl MicCapture {
    /// Opens the default input device and starts collecting mono samples.
    pub fn start() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        tracing::info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::Config(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        tracing::debug!(sample_rate, channels, "Input stream config");

        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = downmix(data, channels);
                    if let Ok(mut buffer) = sink.lock() {
                        buffer.extend_from_slice(&mono);
                    }
                },
                |err| tracing::error!("Input stream error: {err}"),
                None,
            )
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        Ok(Self {
            stream,
            samples,
            sample_rate,
        })
    }

    /// Stops capture and assembles the collected samples into one WAV clip.
    pub fn stop(self) -> Result<AudioClip, CaptureError> {
        // The stream is dropped first so the device is released even when
        // encoding fails below.
        drop(self.stream);

        let samples = match self.samples.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        tracing::debug!(samples = samples.len(), "Capture stopped");

        let data = encode_wav(&samples, self.sample_rate)?;
        Ok(AudioClip {
            mime_type: WAV_MIME.to_string(),
            data,
        })
    }
}

/// Averages interleaved frames down to mono.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Encodes mono f32 samples as 16-bit PCM WAV.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, CaptureError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    for &sample in samples {
        let value = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    Ok(cursor.into_inner())
}
