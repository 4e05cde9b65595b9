/*
 * @file processor.rs
 * @brief Command processing, handler set, and conversational context
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

//! Command processing: matching, dispatch, and context carry-over.
//!
//! The processor itself never fails. Every handler catches its own
//! collaborator errors and converts them into a spoken apology, so one
//! handler's failure never aborts the assistant loop or corrupts the
//! conversational context.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;

use crate::assistant::ControlFlags;
use crate::commands::{self, CommandsConfig, Intent};
use crate::frontend::Frontend;
use crate::lookup::{self, Lookup};
use crate::mathexpr;
use crate::notes;
use crate::player::PlaybackLauncher;
use crate::speech::SpeechQueue;

/// Spoken when no registered trigger phrase occurs in the input.
const FALLBACK_RESPONSE: &str =
    "I didn't quite understand that. You can say 'help' to hear what I can do.";

/// Short spoken capability summary.
const HELP_SPOKEN: &str = "I can help with time, searching, playing music, math, and notes.";

/// Longer capability summary written to the conversation log.
const HELP_LOG: &str = "I can help you with:\n\
                        - Time and Date\n\
                        - Searching Wikipedia\n\
                        - Playing music on YouTube\n\
                        - Simple calculations\n\
                        - Taking and reading notes";

/// Delay between the spoken farewell and teardown.
const EXIT_GRACE: Duration = Duration::from_millis(1500);

/// Leading trigger phrases stripped from search queries.
const SEARCH_PREFIXES: [&str; 6] = [
    "search for",
    "search",
    "tell me about",
    "who is",
    "what is",
    "define",
];

/// Trigger phrases stripped from note content.
const NOTE_PREFIXES: [&str; 3] = ["take a note", "note this", "write down"];

/// Conversational context consulted by follow-up handling.
///
/// # Details
/// Written only by the processor after a successful non-continuation
/// dispatch; read by the continuation handler. Access goes through a
/// mutex because typed commands race voice commands across tasks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationContext {
    /// Intent of the last successfully dispatched non-continuation command.
    pub last_intent: Option<Intent>,
    /// Topic of the last search, used for "also/and" follow-ups.
    pub last_topic: Option<String>,
}

/// Handles parsing and execution of user commands.
///
/// # Details
/// Owns the command registry, the conversational context, and references
/// to every collaborator a handler may need. Shared behind an `Arc` so
/// short-lived submission tasks and the assistant loop can dispatch
/// through the same instance.
pub struct CommandProcessor {
    registry: CommandsConfig,
    context: Mutex<ConversationContext>,
    queue: Arc<SpeechQueue>,
    frontend: Arc<dyn Frontend>,
    lookup: Arc<dyn Lookup>,
    player: Arc<dyn PlaybackLauncher>,
    note_log: PathBuf,
    control: Arc<ControlFlags>,
}

impl CommandProcessor {
    /// Creates a processor over the given registry and collaborators.
    ///
    /// # Arguments
    /// * `registry` - Ordered command registry; order is priority.
    /// * `queue` - Speech queue receiving every spoken response.
    /// * `frontend` - Conversation log and status sink.
    /// * `lookup` - Encyclopedia collaborator.
    /// * `player` - Media playback collaborator.
    /// * `note_log` - Path of the append-only note log.
    /// * `control` - Shared flags used to request teardown on exit.
    ///
    /// # Returns
    /// * `Self` - A processor with empty conversational context.
    pub fn new(
        registry: CommandsConfig,
        queue: Arc<SpeechQueue>,
        frontend: Arc<dyn Frontend>,
        lookup: Arc<dyn Lookup>,
        player: Arc<dyn PlaybackLauncher>,
        note_log: PathBuf,
        control: Arc<ControlFlags>,
    ) -> Self {
        Self {
            registry,
            context: Mutex::new(ConversationContext::default()),
            queue,
            frontend,
            lookup,
            player,
            note_log,
            control,
        }
    }

    /// Processes one utterance end to end.
    ///
    /// # Details
    /// Normalizes the text, resolves it against the registry, dispatches
    /// the matching handler, and records the resolved intent in the
    /// context - unless the intent is the continuation intent, which is
    /// excluded from the overwrite rule so follow-ups keep referring to
    /// the command that preceded them. Unmatched input speaks a fixed
    /// fallback and leaves the context untouched.
    ///
    /// # Arguments
    /// * `text` - The raw utterance from voice or typed input.
    pub async fn process(&self, text: &str) {
        let normalized = text.to_lowercase();
        let normalized = normalized.trim();
        if normalized.is_empty() {
            return;
        }
        let matched = commands::find_command(&self.registry, normalized).map(|spec| spec.intent);
        let Some(intent) = matched else {
            self.speak(FALLBACK_RESPONSE);
            return;
        };
        self.frontend.set_status("Processing...");
        self.dispatch(intent, normalized).await;
        if intent != Intent::Context {
            self.context.lock().unwrap().last_intent = Some(intent);
        }
        self.frontend.set_status("Idle");
    }

    /// Returns a snapshot of the conversational context.
    pub fn context(&self) -> ConversationContext {
        self.context.lock().unwrap().clone()
    }

    async fn dispatch(&self, intent: Intent, text: &str) {
        match intent {
            Intent::Time => self.handle_time(),
            Intent::Date => self.handle_date(),
            Intent::Search => self.handle_search(text).await,
            Intent::Play => self.handle_play(text),
            Intent::Math => self.handle_math(text),
            Intent::NoteTake => self.handle_take_note(text),
            Intent::NoteRead => self.handle_read_notes(),
            Intent::Help => self.handle_help(),
            Intent::Exit => self.handle_exit(),
            Intent::Context => self.handle_context(text).await,
        }
    }

    fn speak(&self, text: &str) {
        self.queue.push(text);
    }

    /// Speaks the current local time.
    fn handle_time(&self) {
        let time_str = Local::now().format("%I:%M %p");
        self.speak(&format!("The time is {}.", time_str));
    }

    /// Speaks the current local date.
    fn handle_date(&self) {
        let date_str = Local::now().format("%A, %B %d, %Y");
        self.speak(&format!("Today is {}.", date_str));
    }

    /// Looks a topic up and speaks a cleaned synopsis.
    ///
    /// # Details
    /// Strips the leading trigger phrase to extract the query, remembers
    /// it as the follow-up topic, then asks the encyclopedia collaborator.
    /// Lookup failures become a generic spoken apology; the cause is
    /// logged for diagnostics only.
    async fn handle_search(&self, text: &str) {
        let mut query = text;
        for prefix in SEARCH_PREFIXES {
            if let Some(rest) = text.strip_prefix(prefix) {
                query = rest.trim();
                break;
            }
        }
        if query.is_empty() {
            self.speak("What would you like me to search for?");
            return;
        }
        self.speak(&format!("Searching for {}...", query));
        self.context.lock().unwrap().last_topic = Some(query.to_string());
        match self.lookup.lookup(query).await {
            Ok(page) if page.exists => self.speak(&lookup::clean_synopsis(&page.summary)),
            Ok(_) => self.speak(&format!(
                "I couldn't find any specific information on {}.",
                query
            )),
            Err(err) => {
                tracing::warn!("encyclopedia lookup failed: {:#}", err);
                self.speak("I'm having trouble accessing Wikipedia right now.");
            }
        }
    }

    /// Announces playback and delegates to the launcher.
    fn handle_play(&self, text: &str) {
        let stripped = text.replace("play", "");
        let song = stripped.trim();
        if song.is_empty() {
            self.speak("What should I play?");
            return;
        }
        self.speak(&format!("Playing {} on YouTube.", song));
        if let Err(err) = self.player.launch(song) {
            tracing::warn!("playback launch failed: {:#}", err);
            self.speak("I couldn't play that right now.");
        }
    }

    /// Evaluates a spoken arithmetic problem.
    ///
    /// # Details
    /// Translates word operators, discards everything outside the
    /// arithmetic allow-list, and runs the minimal recursive-descent
    /// evaluator. Input whose residue carries no digits asks for a
    /// problem; evaluation errors are spoken, never propagated.
    fn handle_math(&self, text: &str) {
        let expression = text.replace("calculate", "").replace("what is", "");
        let cleaned = mathexpr::sanitize(&mathexpr::translate_operators(&expression));
        if !mathexpr::has_operand(&cleaned) {
            self.speak("Please say a math problem.");
            return;
        }
        match mathexpr::evaluate(&cleaned) {
            Ok(value) => self.speak(&format!("The answer is {}.", mathexpr::format_result(value))),
            Err(err) => {
                tracing::debug!("calculation failed: {:#}", err);
                self.speak("I couldn't calculate that.");
            }
        }
    }

    /// Appends a note to the persistent log.
    fn handle_take_note(&self, text: &str) {
        let mut content = text;
        for prefix in NOTE_PREFIXES {
            if let Some((_, rest)) = text.split_once(prefix) {
                content = rest.trim();
                break;
            }
        }
        if content.is_empty() {
            self.speak("What should I write down?");
            return;
        }
        match notes::append_note(&self.note_log, content) {
            Ok(()) => self.speak("I've saved that note for you."),
            Err(err) => {
                tracing::warn!("note write failed: {:#}", err);
                self.speak("I couldn't save the note.");
            }
        }
    }

    /// Speaks the most recent notes, one utterance per note.
    fn handle_read_notes(&self) {
        if !self.note_log.exists() {
            self.speak("You don't have any notes yet.");
            return;
        }
        match notes::read_recent(&self.note_log, notes::RECENT_NOTE_COUNT) {
            Ok(recent) if recent.is_empty() => self.speak("Your notes file is empty."),
            Ok(recent) => {
                self.speak(&format!("Here are your last {} notes.", recent.len()));
                for note in recent {
                    self.speak(&note);
                }
            }
            Err(err) => {
                tracing::warn!("note read failed: {:#}", err);
                self.speak("I couldn't read your notes.");
            }
        }
    }

    /// Continues the previous query with a follow-up search.
    ///
    /// # Details
    /// Only meaningful when the last dispatched intent was a search;
    /// otherwise the reference is ambiguous and the handler says so. The
    /// continuation itself never overwrites the remembered intent - the
    /// processor excludes it from the overwrite rule.
    async fn handle_context(&self, text: &str) {
        let last_intent = self.context.lock().unwrap().last_intent;
        if last_intent == Some(Intent::Search) {
            let stripped = text.replace("and", "").replace("also", "");
            let query = stripped.trim();
            if query.is_empty() {
                self.speak("What else would you like to know?");
            } else {
                self.speak(&format!("Also searching for {}...", query));
                self.handle_search(query).await;
            }
        } else {
            self.speak("I'm not sure what you're referring to.");
        }
    }

    /// Speaks and logs the capability summary.
    fn handle_help(&self) {
        self.frontend.log("System", HELP_LOG);
        self.speak(HELP_SPOKEN);
    }

    /// Speaks a farewell and schedules teardown after a short grace delay.
    fn handle_exit(&self) {
        self.speak("Goodbye!");
        let control = self.control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(EXIT_GRACE).await;
            control.request_stop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::testing::RecordingFrontend;
    use crate::lookup::LookupPage;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::fs;

    struct ScriptedLookup {
        page: Option<LookupPage>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn found(summary: &str) -> Self {
            Self {
                page: Some(LookupPage {
                    exists: true,
                    summary: summary.to_string(),
                }),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn missing() -> Self {
            Self {
                page: Some(LookupPage {
                    exists: false,
                    summary: String::new(),
                }),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                page: None,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Lookup for ScriptedLookup {
        async fn lookup(&self, topic: &str) -> Result<LookupPage> {
            self.queries.lock().unwrap().push(topic.to_string());
            match &self.page {
                Some(page) => Ok(page.clone()),
                None => anyhow::bail!("service unreachable"),
            }
        }
    }

    struct RecordingLauncher {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingLauncher {
        fn new(fail: bool) -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl PlaybackLauncher for RecordingLauncher {
        fn launch(&self, query: &str) -> Result<()> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                anyhow::bail!("launcher unavailable");
            }
            Ok(())
        }
    }

    struct Harness {
        processor: CommandProcessor,
        queue: Arc<SpeechQueue>,
        frontend: Arc<RecordingFrontend>,
        launcher: Arc<RecordingLauncher>,
        control: Arc<ControlFlags>,
        note_log: PathBuf,
    }

    impl Harness {
        fn with_lookup(name: &str, lookup: Arc<dyn Lookup>) -> Self {
            Self::build(name, lookup, Arc::new(RecordingLauncher::new(false)))
        }

        fn build(name: &str, lookup: Arc<dyn Lookup>, launcher: Arc<RecordingLauncher>) -> Self {
            let note_log = std::env::temp_dir().join(format!("jarvis_{}_notes.txt", name));
            fs::remove_file(&note_log).ok();
            let queue = Arc::new(SpeechQueue::new());
            let frontend = Arc::new(RecordingFrontend::default());
            let control = Arc::new(ControlFlags::new());
            let processor = CommandProcessor::new(
                commands::default_registry(),
                queue.clone(),
                frontend.clone(),
                lookup,
                launcher.clone(),
                note_log.clone(),
                control.clone(),
            );
            Self {
                processor,
                queue,
                frontend,
                launcher,
                control,
                note_log,
            }
        }

        fn drain(&self) -> Vec<String> {
            let mut spoken = Vec::new();
            while let Some(text) = self.queue.pop() {
                spoken.push(text);
            }
            spoken
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            fs::remove_file(&self.note_log).ok();
        }
    }

    fn harness(name: &str) -> Harness {
        Harness::with_lookup(name, Arc::new(ScriptedLookup::missing()))
    }

    #[tokio::test]
    async fn unmatched_input_speaks_fallback_and_leaves_context() {
        let h = harness("fallback");
        h.processor.process("zzz gibberish").await;
        assert_eq!(h.drain(), vec![FALLBACK_RESPONSE.to_string()]);
        assert_eq!(h.processor.context(), ConversationContext::default());
        assert!(h.frontend.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let h = harness("empty");
        h.processor.process("   ").await;
        assert!(h.drain().is_empty());
        assert_eq!(h.processor.context(), ConversationContext::default());
    }

    #[tokio::test]
    async fn registration_order_resolves_keyword_ties() {
        let h = harness("ties");
        // "what is" belongs to search, but "time" is registered earlier.
        h.processor.process("What is the time").await;
        let spoken = h.drain();
        assert_eq!(spoken.len(), 1);
        assert!(spoken[0].starts_with("The time is "));
        assert_eq!(h.processor.context().last_intent, Some(Intent::Time));
    }

    #[tokio::test]
    async fn matched_commands_cycle_processing_status() {
        let h = harness("status");
        h.processor.process("what time is it").await;
        let statuses = h.frontend.statuses.lock().unwrap().clone();
        assert_eq!(statuses, vec!["Processing...".to_string(), "Idle".to_string()]);
    }

    #[tokio::test]
    async fn search_speaks_cleaned_bounded_synopsis() {
        let sentence = format!("{} end[1] (aside).", "very long words ".repeat(12));
        let summary = sentence.repeat(6);
        let h = Harness::with_lookup("clean", Arc::new(ScriptedLookup::found(&summary)));
        h.processor.process("who is Ada Lovelace").await;
        let spoken = h.drain();
        assert_eq!(spoken[0], "Searching for ada lovelace...");
        let synopsis = &spoken[1];
        assert!(!synopsis.contains('['));
        assert!(!synopsis.contains('('));
        assert!(synopsis.chars().count() <= 603);
        assert!(synopsis.ends_with("..."));
        let context = h.processor.context();
        assert_eq!(context.last_intent, Some(Intent::Search));
        assert_eq!(context.last_topic.as_deref(), Some("ada lovelace"));
    }

    #[tokio::test]
    async fn search_missing_topic_is_named() {
        let h = Harness::with_lookup("missing", Arc::new(ScriptedLookup::missing()));
        h.processor.process("search xyzzynonexistent").await;
        let spoken = h.drain();
        assert_eq!(
            spoken[1],
            "I couldn't find any specific information on xyzzynonexistent."
        );
    }

    #[tokio::test]
    async fn search_failure_becomes_spoken_apology() {
        let h = Harness::with_lookup("unreachable", Arc::new(ScriptedLookup::unreachable()));
        h.processor.process("tell me about rust").await;
        let spoken = h.drain();
        assert_eq!(spoken[1], "I'm having trouble accessing Wikipedia right now.");
        // The topic is remembered even when the lookup fails.
        assert_eq!(h.processor.context().last_topic.as_deref(), Some("rust"));
    }

    #[tokio::test]
    async fn bare_search_asks_for_a_query() {
        let h = harness("bare_search");
        h.processor.process("search").await;
        assert_eq!(h.drain(), vec!["What would you like me to search for?".to_string()]);
    }

    #[tokio::test]
    async fn math_follows_standard_precedence() {
        let h = harness("precedence");
        h.processor.process("calculate 10 plus 5 times 2").await;
        assert_eq!(h.drain(), vec!["The answer is 20.".to_string()]);
    }

    #[tokio::test]
    async fn digitless_math_asks_for_a_problem() {
        let h = harness("digitless");
        h.processor.process("calculate one divided by zero").await;
        assert_eq!(h.drain(), vec!["Please say a math problem.".to_string()]);
    }

    #[tokio::test]
    async fn numeric_division_by_zero_cannot_calculate() {
        let h = harness("div_zero");
        h.processor.process("calculate 2 divided by 0").await;
        assert_eq!(h.drain(), vec!["I couldn't calculate that.".to_string()]);
    }

    #[tokio::test]
    async fn notes_round_trip_without_timestamp_prefix() {
        let h = harness("roundtrip");
        h.processor.process("take a note buy milk").await;
        assert_eq!(h.drain(), vec!["I've saved that note for you.".to_string()]);
        h.processor.process("read my notes").await;
        let spoken = h.drain();
        assert_eq!(spoken[0], "Here are your last 1 notes.");
        assert_eq!(spoken[1], "buy milk");
        assert!(!spoken[1].contains('['));
    }

    #[tokio::test]
    async fn reading_notes_never_mutates_the_log() {
        let h = harness("read_idempotent");
        h.processor.process("take a note alpha").await;
        h.processor.process("take a note beta").await;
        h.drain();
        h.processor.process("read my notes").await;
        let first = h.drain();
        h.processor.process("read my notes").await;
        let second = h.drain();
        assert_eq!(first, second);
        assert_eq!(h.processor.context().last_intent, Some(Intent::NoteRead));
    }

    #[tokio::test]
    async fn reading_without_a_log_says_so() {
        let h = harness("no_log");
        h.processor.process("read my notes").await;
        assert_eq!(h.drain(), vec!["You don't have any notes yet.".to_string()]);
    }

    #[tokio::test]
    async fn empty_note_asks_what_to_write() {
        let h = harness("empty_note");
        h.processor.process("take a note").await;
        assert_eq!(h.drain(), vec!["What should I write down?".to_string()]);
    }

    #[tokio::test]
    async fn continuation_reinvokes_search_and_keeps_intent() {
        let lookup = Arc::new(ScriptedLookup::missing());
        let h = Harness::with_lookup("continuation", lookup.clone());
        h.processor.process("search cats").await;
        h.drain();
        h.processor.process("and dogs").await;
        let spoken = h.drain();
        assert_eq!(spoken[0], "Also searching for dogs...");
        assert_eq!(spoken[1], "Searching for dogs...");
        assert_eq!(h.processor.context().last_intent, Some(Intent::Search));
        assert_eq!(h.processor.context().last_topic.as_deref(), Some("dogs"));
        assert_eq!(
            lookup.queries.lock().unwrap().clone(),
            vec!["cats".to_string(), "dogs".to_string()]
        );
    }

    #[tokio::test]
    async fn continuation_without_search_context_is_unclear() {
        let h = harness("unclear");
        h.processor.process("and dogs").await;
        assert_eq!(
            h.drain(),
            vec!["I'm not sure what you're referring to.".to_string()]
        );
        assert_eq!(h.processor.context().last_intent, None);
    }

    #[tokio::test]
    async fn bare_continuation_asks_what_else() {
        let h = harness("bare_continuation");
        h.processor.process("search cats").await;
        h.drain();
        h.processor.process("and also").await;
        assert_eq!(
            h.drain(),
            vec!["What else would you like to know?".to_string()]
        );
    }

    #[tokio::test]
    async fn play_announces_then_delegates() {
        let h = harness("play");
        h.processor.process("play bohemian rhapsody").await;
        assert_eq!(
            h.drain(),
            vec!["Playing bohemian rhapsody on YouTube.".to_string()]
        );
        assert_eq!(
            h.launcher.queries.lock().unwrap().clone(),
            vec!["bohemian rhapsody".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_playback_apologizes_after_announcing() {
        let h = Harness::build(
            "play_fail",
            Arc::new(ScriptedLookup::missing()),
            Arc::new(RecordingLauncher::new(true)),
        );
        h.processor.process("play something").await;
        let spoken = h.drain();
        assert_eq!(spoken[0], "Playing something on YouTube.");
        assert_eq!(spoken[1], "I couldn't play that right now.");
    }

    #[tokio::test]
    async fn help_speaks_and_logs_the_longer_summary() {
        let h = harness("help");
        h.processor.process("help").await;
        assert_eq!(h.drain(), vec![HELP_SPOKEN.to_string()]);
        let lines = h.frontend.lines.lock().unwrap().clone();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "System");
        assert!(lines[0].1.contains("Taking and reading notes"));
    }

    #[tokio::test(start_paused = true)]
    async fn exit_speaks_farewell_then_requests_stop() {
        let h = harness("exit");
        h.processor.process("goodbye").await;
        assert_eq!(h.drain(), vec!["Goodbye!".to_string()]);
        assert!(!h.control.stop_requested());
        tokio::time::sleep(EXIT_GRACE + Duration::from_millis(10)).await;
        assert!(h.control.stop_requested());
    }
}
