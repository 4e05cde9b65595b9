//! Speech output queue and text-to-speech rendering.
//!
//! All spoken output funnels through [`SpeechQueue`]: producers on any
//! thread push utterances, and the assistant loop is the single consumer
//! that drains the queue to completion before each listen attempt, so
//! overlapping speak calls never interleave audio.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use tokio::sync::Notify;

use crate::config::AssistantConfig;

/// Narrow interface to the speech synthesizer.
///
/// Rendering is fire-and-forget from the assistant's perspective; the
/// consumer swallows errors rather than retrying.
pub trait SpeechRenderer: Send + Sync {
    /// Renders one utterance, blocking until playback completes.
    ///
    /// # Errors
    /// Returns an error if the synthesizer fails to start or exits
    /// unexpectedly.
    fn render(&self, text: &str) -> Result<()>;
}

/// Thread-safe FIFO of pending utterances.
///
/// # Details
/// `push` is non-blocking and callable from any thread; consumption
/// happens on the assistant loop only. Each queued utterance is consumed
/// exactly once and never mutated. Pushes wake the loop through the
/// embedded [`Notify`] so idle iterations block instead of busy-polling.
pub struct SpeechQueue {
    entries: Mutex<VecDeque<String>>,
    wake: Notify,
}

impl SpeechQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
        }
    }

    /// Appends an utterance; no-op on empty or whitespace-only text.
    ///
    /// # Parameters
    /// * `text` - The utterance to vocalize later.
    pub fn push(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.entries.lock().unwrap().push_back(text.to_string());
        self.wake.notify_one();
    }

    /// Pops the oldest pending utterance, if any.
    pub fn pop(&self) -> Option<String> {
        self.entries.lock().unwrap().pop_front()
    }

    /// Reports whether any utterances are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Waits until a producer pushes a new utterance.
    pub async fn wait(&self) {
        self.wake.notified().await;
    }
}

impl Default for SpeechQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderer backed by the macOS `say` command.
pub struct SayRenderer {
    voice: Option<String>,
    rate: u32,
    volume: f32,
}

impl SayRenderer {
    /// Builds a renderer from the assistant configuration.
    ///
    /// # Details
    /// The voice is chosen by explicit index into the synthesizer's
    /// inventory when configured, otherwise by scanning the inventory for
    /// the first name from the preference list. With neither, the system
    /// default voice is used.
    ///
    /// # Parameters
    /// * `config` - Loaded assistant configuration.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let inventory = available_voices();
        let voice = select_voice(config, &inventory);
        if let Some(name) = &voice {
            tracing::debug!("selected voice {}", name);
        }
        Self {
            voice,
            rate: config.speech_rate(),
            volume: config.speech_volume,
        }
    }
}

impl SpeechRenderer for SayRenderer {
    fn render(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot speak empty text");
        }
        run_say(text, self.voice.as_deref(), self.rate, self.volume)
    }
}

fn run_say(text: &str, voice: Option<&str>, rate: u32, volume: f32) -> Result<()> {
    if cfg!(test) {
        if *FORCE_ERROR.lock().unwrap() {
            anyhow::bail!("Forced failure for testing");
        }
        return Ok(());
    }

    let mut command = std::process::Command::new("say");
    command.arg("-r").arg(rate.to_string());
    if let Some(name) = voice {
        command.arg("-v").arg(name);
    }
    // The synthesizer honors inline volume directives.
    command.arg(format!("[[volm {:.2}]] {}", volume, text));
    command.output()?;
    Ok(())
}

/// Picks a voice per the configured index or preference list.
fn select_voice(config: &AssistantConfig, inventory: &[String]) -> Option<String> {
    if let Some(index) = config.voice_index {
        if let Some(name) = inventory.get(index) {
            return Some(name.clone());
        }
    }
    config.preferred_voices.iter().find_map(|preferred| {
        inventory
            .iter()
            .find(|name| name.to_lowercase().contains(&preferred.to_lowercase()))
            .cloned()
    })
}

/// Queries the synthesizer's voice inventory.
///
/// Returns an empty inventory when the query fails; the renderer then
/// falls back to the system default voice.
fn available_voices() -> Vec<String> {
    if cfg!(test) {
        return Vec::new();
    }
    let output = match std::process::Command::new("say").args(["-v", "?"]).output() {
        Ok(output) => output,
        Err(err) => {
            tracing::debug!("voice inventory query failed: {}", err);
            return Vec::new();
        }
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.to_string())
        .collect()
}

#[cfg_attr(not(test), allow(dead_code))]
static FORCE_ERROR: Mutex<bool> = Mutex::new(false);

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> SayRenderer {
        SayRenderer::from_config(&AssistantConfig::default())
    }

    #[test]
    fn queue_preserves_fifo_order() {
        let queue = SpeechQueue::new();
        queue.push("first");
        queue.push("second");
        queue.push("third");
        assert_eq!(queue.pop().as_deref(), Some("first"));
        assert_eq!(queue.pop().as_deref(), Some("second"));
        assert_eq!(queue.pop().as_deref(), Some("third"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn empty_text_is_not_queued() {
        let queue = SpeechQueue::new();
        queue.push("");
        queue.push("   ");
        assert!(queue.is_empty());
    }

    #[test]
    fn render_succeeds_with_text() {
        assert!(renderer().render("Hello test").is_ok());
    }

    #[test]
    fn render_fails_when_forced() {
        *super::FORCE_ERROR.lock().unwrap() = true;
        let result = renderer().render("failure case");
        *super::FORCE_ERROR.lock().unwrap() = false;
        assert!(result.is_err());
    }

    #[test]
    fn render_rejects_empty_text() {
        assert!(renderer().render("   ").is_err());
    }

    #[test]
    fn voice_selection_prefers_explicit_index() {
        let inventory = vec!["Alex".to_string(), "Samantha".to_string()];
        let mut config = AssistantConfig::default();
        config.voice_index = Some(0);
        assert_eq!(select_voice(&config, &inventory).as_deref(), Some("Alex"));
        config.voice_index = None;
        assert_eq!(
            select_voice(&config, &inventory).as_deref(),
            Some("Samantha")
        );
    }

    #[tokio::test]
    async fn push_wakes_a_waiting_consumer() {
        let queue = std::sync::Arc::new(SpeechQueue::new());
        let waiter = queue.clone();
        let task = tokio::spawn(async move {
            waiter.wait().await;
            waiter.pop()
        });
        // Give the waiter a moment to park before pushing.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        queue.push("wake up");
        let popped = task.await.expect("waiter completes");
        assert_eq!(popped.as_deref(), Some("wake up"));
    }
}
