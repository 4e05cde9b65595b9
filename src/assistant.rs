/*
 * @file assistant.rs
 * @brief Assistant loop and console wiring for Jarvis
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

//! Assistant loop orchestration.
//!
//! One background task alternates between two phases: drain the speech
//! queue to completion, then - when listening is armed - perform a single
//! listen-and-transcribe attempt. Queued speech therefore always finishes
//! rendering before the next listening window opens, and the assistant
//! never talks over its own microphone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncBufReadExt;

use crate::commands;
use crate::config::AssistantConfig;
use crate::frontend::{ConsoleFrontend, Frontend};
use crate::lookup::WikipediaClient;
use crate::player::YoutubeLauncher;
use crate::processor::CommandProcessor;
use crate::speech::{SayRenderer, SpeechQueue, SpeechRenderer};
use crate::stt::{ListenOutcome, SpeechToText, WhisperListener};

/// Spoken once when the loop starts.
const GREETING: &str = "Hello, I am ready to help.";

/// Pause between consecutive rendered utterances, to avoid audio clipping.
const UTTERANCE_GAP: Duration = Duration::from_millis(200);

/// Sleep bound while idle; listening and stop requests are noticed within
/// this window even without a queue wake-up.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Cross-task control flags shared by the loop, the processor, and the
/// console frontend.
///
/// # Details
/// Listening is single-shot: the frontend arms it, the loop performs one
/// attempt and clears it again. The stop flag is checked once per
/// iteration boundary; teardown is therefore not instantaneous - the loop
/// finishes its current iteration first.
pub struct ControlFlags {
    stop: AtomicBool,
    listening: AtomicBool,
}

impl ControlFlags {
    /// Creates flags in the running, not-listening state.
    pub fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            listening: AtomicBool::new(false),
        }
    }

    /// Requests loop teardown at the next iteration boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Reports whether teardown has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Arms one listen attempt.
    pub fn arm_listening(&self) {
        self.listening.store(true, Ordering::SeqCst);
    }

    /// Clears the listening flag after an attempt.
    pub fn clear_listening(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    /// Reports whether a listen attempt is armed.
    pub fn listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime container that owns the loop's collaborators.
///
/// # Details
/// Holds the speech queue, the processor, the speech renderer, the
/// listener, and the shared control flags for the duration of the
/// session. The runtime is consumed by [`AssistantRuntime::run_loop`].
pub struct AssistantRuntime {
    queue: Arc<SpeechQueue>,
    frontend: Arc<dyn Frontend>,
    processor: Arc<CommandProcessor>,
    renderer: Box<dyn SpeechRenderer>,
    listener: Box<dyn SpeechToText>,
    control: Arc<ControlFlags>,
}

impl AssistantRuntime {
    /// Wires the production collaborators from configuration.
    ///
    /// # Arguments
    /// * `config` - Loaded assistant configuration.
    ///
    /// # Returns
    /// A ready-to-run runtime with an empty speech queue.
    pub fn new(config: &AssistantConfig) -> Self {
        let queue = Arc::new(SpeechQueue::new());
        let frontend: Arc<dyn Frontend> = Arc::new(ConsoleFrontend);
        let control = Arc::new(ControlFlags::new());
        let processor = Arc::new(CommandProcessor::new(
            commands::load_registry(),
            queue.clone(),
            frontend.clone(),
            Arc::new(WikipediaClient::new()),
            Arc::new(YoutubeLauncher),
            config.note_log_path(),
            control.clone(),
        ));
        Self {
            queue,
            frontend,
            processor,
            renderer: Box::new(SayRenderer::from_config(config)),
            listener: Box::new(WhisperListener::from_config(config)),
            control,
        }
    }

    /// Runs the assistant loop until the stop flag is observed.
    ///
    /// # Details
    /// Speaks the greeting, then alternates between draining the speech
    /// queue and - when armed - one listen attempt. When idle the loop
    /// blocks on a queue wake-up with a short sleep fallback instead of
    /// busy-polling.
    pub async fn run_loop(mut self) {
        self.queue.push(GREETING);
        self.frontend.set_status("Idle");

        loop {
            if self.control.stop_requested() {
                break;
            }
            self.drain_speech().await;
            if self.control.listening() {
                self.listen_pass().await;
            } else {
                tokio::select! {
                    _ = self.queue.wait() => {}
                    _ = tokio::time::sleep(IDLE_POLL) => {}
                }
            }
        }
        tracing::info!("assistant loop stopped");
    }

    /// Drains the speech queue to completion, rendering in FIFO order.
    ///
    /// # Details
    /// Each utterance is logged, rendered, and followed by a short pause.
    /// Rendering errors are swallowed - there is simply nothing to say
    /// right now - and never retried.
    async fn drain_speech(&self) {
        while let Some(text) = self.queue.pop() {
            self.frontend.log("Jarvis", &text);
            self.frontend.set_status("Speaking...");
            if let Err(err) = self.renderer.render(&text) {
                tracing::debug!("speech rendering failed: {:#}", err);
            }
            self.frontend.set_status("Idle");
            tokio::time::sleep(UTTERANCE_GAP).await;
        }
    }

    /// Performs one single-shot listen attempt.
    ///
    /// # Details
    /// Transcribed speech is logged and handed to the processor;
    /// unintelligible speech earns a spoken "I didn't catch that.";
    /// microphone errors are logged with an Error status. The listening
    /// flag is cleared afterwards regardless of outcome, so the frontend
    /// must re-arm before each attempt.
    async fn listen_pass(&mut self) {
        self.frontend.set_status("Listening...");
        match self.listener.listen_once() {
            Ok(ListenOutcome::Heard(text)) => {
                let text = text.to_lowercase();
                self.frontend.log("You", &text);
                self.processor.process(&text).await;
            }
            Ok(ListenOutcome::NoSpeech) => {}
            Ok(ListenOutcome::Unintelligible) => {
                self.queue.push("I didn't catch that.");
            }
            Err(err) => {
                tracing::warn!("microphone error: {:#}", err);
                self.frontend.set_status("Error");
                self.frontend.log("System", &format!("Mic error: {}", err));
            }
        }
        self.control.clear_listening();
        self.frontend.set_status("Idle");
    }
}

/// Runs the assistant with the console frontend until exit.
///
/// # Details
/// Spawns the assistant loop as a background task and reads console lines
/// on the current task. A line of `listen` arms one microphone attempt;
/// any other non-empty line is dispatched to the processor on a
/// short-lived task, exactly like a typed submission in the original
/// window frontend. Returns when the loop observes the stop flag or the
/// console closes.
///
/// # Errors
/// Returns an error only if console input becomes unreadable.
pub async fn run_assistant() -> Result<()> {
    let config = AssistantConfig::load();
    let runtime = AssistantRuntime::new(&config);
    let processor = runtime.processor.clone();
    let control = runtime.control.clone();
    let frontend = runtime.frontend.clone();
    let mut loop_task = tokio::spawn(runtime.run_loop());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            _ = &mut loop_task => return Ok(()),
            line = lines.next_line() => {
                let Some(line) = line.with_context(|| "Failed to read console input")? else {
                    break;
                };
                let text = line.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                if text.eq_ignore_ascii_case("listen") {
                    control.arm_listening();
                    continue;
                }
                frontend.log("You", &text);
                let worker = processor.clone();
                tokio::spawn(async move {
                    worker.process(&text).await;
                });
            }
        }
    }
    let _ = loop_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::testing::RecordingFrontend;
    use crate::lookup::{Lookup, LookupPage};
    use crate::player::PlaybackLauncher;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct RecordingRenderer {
        rendered: Arc<Mutex<Vec<String>>>,
    }

    impl SpeechRenderer for RecordingRenderer {
        fn render(&self, text: &str) -> Result<()> {
            self.rendered.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct ScriptedListener {
        outcomes: VecDeque<Result<ListenOutcome>>,
    }

    impl SpeechToText for ScriptedListener {
        fn listen_once(&mut self) -> Result<ListenOutcome> {
            self.outcomes
                .pop_front()
                .unwrap_or(Ok(ListenOutcome::NoSpeech))
        }
    }

    struct NoLookup;

    #[async_trait::async_trait]
    impl Lookup for NoLookup {
        async fn lookup(&self, _topic: &str) -> Result<LookupPage> {
            anyhow::bail!("no lookup in tests")
        }
    }

    struct NoLauncher;

    impl PlaybackLauncher for NoLauncher {
        fn launch(&self, _query: &str) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        runtime: AssistantRuntime,
        frontend: Arc<RecordingFrontend>,
        rendered: Arc<Mutex<Vec<String>>>,
    }

    fn harness(outcomes: Vec<Result<ListenOutcome>>) -> Harness {
        let queue = Arc::new(SpeechQueue::new());
        let frontend = Arc::new(RecordingFrontend::default());
        let control = Arc::new(ControlFlags::new());
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let processor = Arc::new(CommandProcessor::new(
            commands::default_registry(),
            queue.clone(),
            frontend.clone(),
            Arc::new(NoLookup),
            Arc::new(NoLauncher),
            std::env::temp_dir().join("jarvis_assistant_test_notes.txt"),
            control.clone(),
        ));
        let runtime = AssistantRuntime {
            queue,
            frontend: frontend.clone(),
            processor,
            renderer: Box::new(RecordingRenderer {
                rendered: rendered.clone(),
            }),
            listener: Box::new(ScriptedListener {
                outcomes: outcomes.into_iter().collect(),
            }),
            control,
        };
        Harness {
            runtime,
            frontend,
            rendered,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn queued_speech_renders_in_fifo_order() {
        let h = harness(Vec::new());
        h.runtime.queue.push("first");
        h.runtime.queue.push("second");
        h.runtime.drain_speech().await;
        let rendered = h.rendered.lock().unwrap().clone();
        assert_eq!(rendered, vec!["first".to_string(), "second".to_string()]);
        let lines = h.frontend.lines.lock().unwrap().clone();
        let spoken: Vec<&str> = lines.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(spoken, vec!["first", "second"]);
        assert!(h.runtime.queue.is_empty());
        let statuses = h.frontend.statuses.lock().unwrap().clone();
        let statuses: Vec<&str> = statuses.iter().map(String::as_str).collect();
        assert_eq!(statuses, vec!["Speaking...", "Idle", "Speaking...", "Idle"]);
    }

    #[tokio::test]
    async fn heard_speech_reaches_the_processor() {
        let mut h = harness(vec![Ok(ListenOutcome::Heard(
            "what time is it".to_string(),
        ))]);
        h.runtime.control.arm_listening();
        h.runtime.listen_pass().await;
        assert!(!h.runtime.control.listening());
        let response = h.runtime.queue.pop().expect("a spoken response");
        assert!(response.starts_with("The time is "));
        let lines = h.frontend.lines.lock().unwrap().clone();
        assert_eq!(lines[0], ("You".to_string(), "what time is it".to_string()));
    }

    #[tokio::test]
    async fn unintelligible_speech_earns_a_retry_prompt() {
        let mut h = harness(vec![Ok(ListenOutcome::Unintelligible)]);
        h.runtime.control.arm_listening();
        h.runtime.listen_pass().await;
        assert_eq!(
            h.runtime.queue.pop().as_deref(),
            Some("I didn't catch that.")
        );
        assert!(!h.runtime.control.listening());
    }

    #[tokio::test]
    async fn silence_produces_no_response() {
        let mut h = harness(vec![Ok(ListenOutcome::NoSpeech)]);
        h.runtime.control.arm_listening();
        h.runtime.listen_pass().await;
        assert!(h.runtime.queue.is_empty());
        assert!(!h.runtime.control.listening());
    }

    #[tokio::test]
    async fn microphone_errors_are_logged_not_spoken() {
        let mut h = harness(vec![Err(anyhow::anyhow!("device lost"))]);
        h.runtime.control.arm_listening();
        h.runtime.listen_pass().await;
        assert!(h.runtime.queue.is_empty());
        let statuses = h.frontend.statuses.lock().unwrap().clone();
        assert!(statuses.contains(&"Error".to_string()));
        let lines = h.frontend.lines.lock().unwrap().clone();
        assert_eq!(lines[0].0, "System");
    }

    #[tokio::test(start_paused = true)]
    async fn loop_exits_once_stop_is_requested() {
        let h = harness(Vec::new());
        h.runtime.control.request_stop();
        let done = tokio::time::timeout(Duration::from_secs(5), h.runtime.run_loop()).await;
        assert!(done.is_ok());
    }
}
