/*
 * @file config.rs
 * @brief Runtime configuration for the Jarvis assistant
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

//! Assistant configuration loaded from `config.json` with baked defaults.

use std::path::PathBuf;
use std::{env, fs};

use serde::Deserialize;

/// Path to the JSON configuration file that holds runtime defaults.
const CONFIG_PATH: &str = "config.json";

/// Default append-only note log path.
const FALLBACK_NOTE_LOG: &str = "notes.txt";

/// Default speech rate in words per minute.
const DEFAULT_SPEECH_RATE: u32 = 150;

/// Default speech volume in the 0.0 - 1.0 range.
const DEFAULT_SPEECH_VOLUME: f32 = 0.85;

/// Default upper bound on one listen attempt, in seconds.
const DEFAULT_LISTEN_TIMEOUT_SECS: u64 = 5;

/// Default upper bound on one captured phrase, in seconds.
const DEFAULT_PHRASE_LIMIT_SECS: u64 = 8;

/// Strongly typed representation of `config.json`.
///
/// # Details
/// Restates what used to be process-wide appearance and TTS constants as an
/// explicit structure passed at construction. Every field carries a serde
/// default so a partial or missing file still yields a usable configuration.
#[derive(Clone, Deserialize)]
pub struct AssistantConfig {
    /// Voice names tried in order when no explicit index is configured.
    #[serde(default = "fallback_preferred_voices")]
    pub preferred_voices: Vec<String>,
    /// Explicit index into the synthesizer's voice inventory, if any.
    #[serde(default)]
    pub voice_index: Option<usize>,
    /// Speech rate in words per minute.
    #[serde(default = "fallback_speech_rate")]
    pub speech_rate: u32,
    /// Speech volume in the 0.0 - 1.0 range.
    #[serde(default = "fallback_speech_volume")]
    pub speech_volume: f32,
    /// Frontend color theme label; unused by the console frontend.
    #[serde(default = "fallback_theme")]
    pub theme: String,
    /// Path of the append-only note log.
    #[serde(default = "fallback_note_log")]
    pub note_log: String,
    /// Upper bound on one listen attempt, in seconds.
    #[serde(default = "fallback_listen_timeout")]
    pub listen_timeout_secs: u64,
    /// Upper bound on one captured phrase, in seconds.
    #[serde(default = "fallback_phrase_limit")]
    pub phrase_limit_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            preferred_voices: fallback_preferred_voices(),
            voice_index: None,
            speech_rate: fallback_speech_rate(),
            speech_volume: fallback_speech_volume(),
            theme: fallback_theme(),
            note_log: fallback_note_log(),
            listen_timeout_secs: fallback_listen_timeout(),
            phrase_limit_secs: fallback_phrase_limit(),
        }
    }
}

impl AssistantConfig {
    /// Loads configuration from `config.json`, falling back to baked
    /// defaults when the file is missing or invalid.
    ///
    /// # Returns
    /// * `AssistantConfig` - The loaded or default configuration.
    pub fn load() -> Self {
        match fs::read_to_string(CONFIG_PATH) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("config parse error ({}): {}", CONFIG_PATH, err);
                    Self::default()
                }
            },
            Err(err) => {
                tracing::debug!("config load error ({}): {}", CONFIG_PATH, err);
                Self::default()
            }
        }
    }

    /// Resolves the note log path, honoring the `JARVIS_NOTE_LOG`
    /// environment variable over the configured value.
    ///
    /// # Returns
    /// * `PathBuf` - The note log location to use.
    pub fn note_log_path(&self) -> PathBuf {
        env::var("JARVIS_NOTE_LOG")
            .unwrap_or_else(|_| self.note_log.clone())
            .into()
    }

    /// Resolves the speech rate, honoring the `JARVIS_SPEECH_RATE`
    /// environment variable when it parses as a number.
    ///
    /// # Returns
    /// * `u32` - The speech rate in words per minute.
    pub fn speech_rate(&self) -> u32 {
        env::var("JARVIS_SPEECH_RATE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(self.speech_rate)
    }
}

/// Returns the default voice preference list.
///
/// # Details
/// This function exists to satisfy serde's default attribute requirements.
fn fallback_preferred_voices() -> Vec<String> {
    ["Samantha", "Zira", "Karen", "Tessa"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Returns the default speech rate.
fn fallback_speech_rate() -> u32 {
    DEFAULT_SPEECH_RATE
}

/// Returns the default speech volume.
fn fallback_speech_volume() -> f32 {
    DEFAULT_SPEECH_VOLUME
}

/// Returns the default frontend theme label.
fn fallback_theme() -> String {
    "dark-blue".to_string()
}

/// Returns the default note log path.
fn fallback_note_log() -> String {
    FALLBACK_NOTE_LOG.to_string()
}

/// Returns the default listen timeout.
fn fallback_listen_timeout() -> u64 {
    DEFAULT_LISTEN_TIMEOUT_SECS
}

/// Returns the default phrase limit.
fn fallback_phrase_limit() -> u64 {
    DEFAULT_PHRASE_LIMIT_SECS
}
