/*
 * @file audio.rs
 * @brief Microphone capture and WAV helpers for Jarvis
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

//! Microphone capture and WAV file operations.
//!
//! This module records bounded phrases from the default input device using
//! CPAL and persists them for the transcriber.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, StreamError};
use hound::{WavSpec, WavWriter};

/// Sample rate for audio recording (16kHz).
///
/// Value is expressed in Hertz and matches Whisper's preferred input rate.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels (mono).
///
/// Mono input keeps bandwidth low while remaining compatible with Whisper.
const CHANNELS: u16 = 1;

/// Bits per sample for WAV encoding.
///
/// Using 16-bit samples keeps files compact but high-quality.
const BITS_PER_SAMPLE: u16 = 16;

/// Minimum RMS amplitude considered speech.
///
/// Values much above ~300 miss normal speaking levels on some microphones,
/// so we bias toward a lower threshold and rely on Whisper to filter
/// background noise.
pub const SILENCE_RMS_THRESHOLD: f32 = 150.0;

/// Records audio from the default input device for a bounded duration.
///
/// # Parameters
/// * `duration` - Phrase capture window; the caller derives this from the
///   configured phrase limit.
///
/// # Returns
/// A vector of 16-bit PCM audio samples.
///
/// # Errors
/// Returns an error if:
/// - No input device is available
/// - The audio stream cannot be created
/// - Recording fails
pub fn record_phrase(duration: Duration) -> Result<Vec<i16>> {
    let device = default_input_device()?;
    let config = input_config();
    let samples = shared_samples();
    let stream = build_input_stream(&device, &config, samples.clone())?;
    stream.play()?;
    std::thread::sleep(duration);
    drop(stream);
    let captured = samples.lock().unwrap().clone();
    Ok(captured)
}

/// Detects whether audio samples contain meaningful speech content.
///
/// # Details
/// Calculates the root mean square (RMS) energy of the signal and compares
/// it against the silence threshold, so the assistant never transcribes
/// silent or near-silent recordings.
///
/// # Arguments
/// * `samples` - PCM audio samples as signed 16-bit integers.
///
/// # Returns
/// * `bool` - `true` when the RMS energy exceeds the silence threshold.
pub fn contains_speech(samples: &[i16]) -> bool {
    if samples.is_empty() {
        return false;
    }
    let energy = samples
        .iter()
        .map(|sample| (*sample as f32).powi(2))
        .sum::<f32>()
        / samples.len() as f32;
    energy.sqrt() >= SILENCE_RMS_THRESHOLD
}

/// Saves audio samples to a WAV file.
///
/// # Parameters
/// * `path` - Destination path for the generated WAV file.
/// * `samples` - Slice of signed 16-bit PCM audio frames to persist.
///
/// # Returns
/// `Ok(())` if the file was successfully written.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn save_wav(path: &str, samples: &[i16]) -> Result<()> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Locates the system default input device.
///
/// # Returns
/// A CPAL [`Device`] ready for stream construction.
///
/// # Errors
/// Returns an error when the user has no available microphone.
fn default_input_device() -> Result<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| anyhow::anyhow!("No input device"))
}

/// Builds the CPAL stream configuration used by the recorder.
///
/// The configuration uses mono audio, a 16 kHz sample rate, and a default
/// buffer.
fn input_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// Creates the shared buffer that accumulates captured samples.
fn shared_samples() -> Arc<Mutex<Vec<i16>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Builds and configures the CPAL input stream.
///
/// # Parameters
/// * `device` - The input device to capture from.
/// * `config` - The stream configuration (channels/rate/buffer).
/// * `samples` - Shared buffer that receives converted samples.
///
/// # Returns
/// A started-but-paused [`Stream`] the caller can `play`.
///
/// # Errors
/// Returns any stream-construction issues wrapped in [`anyhow::Error`].
fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<Stream> {
    let shared = samples.clone();
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &_| push_samples(&shared, data),
            log_stream_error,
            None,
        )
        .map_err(|err| anyhow::anyhow!(err))
}

/// Converts floating-point frames into 16-bit PCM and appends them to the
/// buffer.
fn push_samples(buffer: &Arc<Mutex<Vec<i16>>>, data: &[f32]) {
    let mut guard = buffer.lock().unwrap();
    for &sample in data {
        guard.push((sample * i16::MAX as f32) as i16);
    }
}

/// Logs recoverable stream errors emitted by CPAL.
fn log_stream_error(error: StreamError) {
    tracing::warn!("audio stream error: {}", error);
}
