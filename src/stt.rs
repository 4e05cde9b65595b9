/*
 * @file stt.rs
 * @brief Speech-to-text collaborator built on local Whisper
 * @author Kevin Thomas
 * @date 2026
 *
 * MIT License
 *
 * Copyright (c) 2026 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Speech-to-text collaborator.
//!
//! The assistant loop only needs four distinguishable outcomes from a
//! listen attempt: heard text, no speech, unintelligible speech, or an
//! error. The production listener captures a bounded phrase from the
//! microphone and transcribes it with a locally cached Whisper model.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::audio;
use crate::config::AssistantConfig;

/// Temporary file used for passing audio samples to Whisper.
///
/// The file lives only for the duration of a single listen attempt and is
/// removed automatically by [`TempAudioGuard`].
const TEMP_AUDIO_PATH: &str = "temp.wav";

/// Whisper model path (auto-downloaded if not present).
const WHISPER_MODEL_PATH: &str = "models/ggml-base.en.bin";

/// Outcome of one listen-and-transcribe attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Intelligible speech, normalized to trimmed text.
    Heard(String),
    /// Nothing above the silence threshold within the capture window.
    NoSpeech,
    /// Audio energy present but no transcribable words.
    Unintelligible,
}

/// Narrow interface to the speech recognizer.
pub trait SpeechToText: Send + Sync {
    /// Performs one blocking listen-and-transcribe attempt.
    ///
    /// # Errors
    /// Returns an error when capture or the recognizer itself fails;
    /// silence and gibberish are outcomes, not errors.
    fn listen_once(&mut self) -> Result<ListenOutcome>;
}

/// Listener that records via CPAL and transcribes with local Whisper.
///
/// # Details
/// The Whisper context is initialized lazily on the first successful
/// capture so startup stays fast and the model download only happens when
/// the microphone is actually used.
pub struct WhisperListener {
    ctx: Option<whisper_rs::WhisperContext>,
    capture_window: Duration,
    patience: Duration,
}

impl WhisperListener {
    /// Creates a listener bounded by the configured phrase limit and
    /// listen timeout.
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            ctx: None,
            capture_window: Duration::from_secs(config.phrase_limit_secs),
            patience: Duration::from_secs(config.listen_timeout_secs),
        }
    }

    /// Ensures the Whisper context is initialized, creating it if needed.
    fn ensure_context(&mut self) -> Result<&whisper_rs::WhisperContext> {
        if self.ctx.is_none() {
            self.ctx = Some(init_whisper()?);
        }
        Ok(self.ctx.as_ref().expect("context set above"))
    }
}

impl SpeechToText for WhisperListener {
    fn listen_once(&mut self) -> Result<ListenOutcome> {
        let samples = audio::record_phrase(self.capture_window)?;
        // A phrase must begin within the timeout window; a capture whose
        // opening seconds are silent counts as no speech at all.
        let patience_span =
            (audio::SAMPLE_RATE as u64 * self.patience.as_secs()) as usize;
        let opening = &samples[..patience_span.min(samples.len())];
        if !audio::contains_speech(opening) {
            return Ok(ListenOutcome::NoSpeech);
        }
        audio::save_wav(TEMP_AUDIO_PATH, &samples)
            .with_context(|| "Failed to persist captured audio")?;
        let _guard = TempAudioGuard;
        let audio_data = load_audio_for_whisper(TEMP_AUDIO_PATH)?;
        let ctx = self.ensure_context()?;
        let text = run_whisper_inference(ctx, &audio_data)?;
        if text.is_empty() {
            Ok(ListenOutcome::Unintelligible)
        } else {
            Ok(ListenOutcome::Heard(text))
        }
    }
}

/// RAII guard that removes the temporary WAV file at scope exit.
struct TempAudioGuard;

impl Drop for TempAudioGuard {
    /// Ensures the temp file is always removed, even on early returns.
    fn drop(&mut self) {
        fs::remove_file(TEMP_AUDIO_PATH).ok();
    }
}

/// Initializes the Whisper context, downloading the model if needed.
///
/// # Details
/// Creates the models directory, downloads the GGML model from Hugging
/// Face if not already present, and initializes a CPU-based Whisper
/// context. First use may take several minutes due to the ~147 MB model
/// download.
///
/// # Returns
/// * `Ok(WhisperContext)` - Ready-to-use Whisper context.
///
/// # Errors
/// Returns an error if directory creation, model download, or context
/// initialization fails.
fn init_whisper() -> Result<whisper_rs::WhisperContext> {
    use whisper_rs::WhisperContext;
    fs::create_dir_all("models")?;
    if !Path::new(WHISPER_MODEL_PATH).exists() {
        tracing::info!("downloading Whisper model (this may take a few minutes)");
        download_whisper_model()?;
    }
    let mut params = whisper_rs::WhisperContextParameters::default();
    params.use_gpu(false);
    WhisperContext::new_with_params(WHISPER_MODEL_PATH, params)
        .with_context(|| "Failed to initialize Whisper")
}

/// Downloads the Whisper GGML model from Hugging Face.
///
/// # Details
/// Uses the curl command-line tool to fetch the base.en model from the
/// official ggerganov/whisper.cpp repository, following redirects to
/// handle the CDN.
///
/// # Errors
/// Returns an error if curl is not installed, execution fails, or the
/// HTTP request is unsuccessful.
fn download_whisper_model() -> Result<()> {
    const MODEL_URL: &str =
        "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.en.bin";
    let output = std::process::Command::new("curl")
        .args(["-L", "-o", WHISPER_MODEL_PATH, MODEL_URL])
        .output()
        .with_context(|| "Failed to execute curl")?;
    if !output.status.success() {
        anyhow::bail!("Failed to download Whisper model");
    }
    tracing::info!("Whisper model downloaded successfully");
    Ok(())
}

/// Loads and preprocesses a WAV file for Whisper transcription.
///
/// # Details
/// Converts 16-bit PCM samples to normalized f32 values, resamples to
/// 16 kHz when the source rate differs, and downmixes stereo to mono.
/// Whisper requires 16 kHz mono input.
///
/// # Errors
/// Returns an error if the file cannot be opened, is not a valid WAV, or
/// sample reading fails.
fn load_audio_for_whisper(path: &str) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path))?;
    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| "Failed to read WAV samples")?;
    let mut audio_data: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();
    if spec.sample_rate != 16000 {
        audio_data = resample(&audio_data, spec.sample_rate, 16000);
    }
    if spec.channels == 2 {
        audio_data = audio_data
            .chunks(2)
            .map(|chunk| (chunk[0] + chunk[1]) / 2.0)
            .collect();
    }
    Ok(audio_data)
}

/// Resamples audio with linear interpolation.
///
/// Not as precise as sinc interpolation, but computationally cheap and
/// sufficient for speech recognition input.
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = from_rate as f32 / to_rate as f32;
    let output_len = (input.len() as f32 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        output.push(sample_at_position(input, i as f32 * ratio));
    }
    output
}

/// Gets a linearly interpolated sample at a fractional position.
fn sample_at_position(input: &[f32], pos: f32) -> f32 {
    let idx = pos as usize;
    if idx + 1 < input.len() {
        let frac = pos - idx as f32;
        input[idx] * (1.0 - frac) + input[idx + 1] * frac
    } else if idx < input.len() {
        input[idx]
    } else {
        0.0
    }
}

/// Runs Whisper inference and joins the transcribed segments.
///
/// # Details
/// Creates a Whisper state, runs the full transcription pipeline with
/// greedy sampling and English forced, and concatenates the text of all
/// detected segments.
///
/// # Errors
/// Returns an error if state creation or transcription fails.
fn run_whisper_inference(ctx: &whisper_rs::WhisperContext, audio_data: &[f32]) -> Result<String> {
    let mut params =
        whisper_rs::FullParams::new(whisper_rs::SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some("en"));
    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    let mut state = ctx
        .create_state()
        .with_context(|| "Failed to create Whisper state")?;
    state
        .full(params, audio_data)
        .with_context(|| "Whisper transcription failed")?;
    let num_segments = state.full_n_segments().unwrap_or(0);
    let mut text = String::new();
    for i in 0..num_segments {
        if let Ok(segment) = state.full_get_segment_text(i) {
            text.push_str(&segment);
            text.push(' ');
        }
    }
    Ok(text.trim().to_string())
}
