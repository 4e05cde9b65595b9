/*
 * @file commands.rs
 * @brief Intent registry and keyword matching logic
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

//! Intent registry: keyword sets mapped to intent tags, matched by substring.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Path to the optional commands configuration file.
const COMMANDS_FILE: &str = "commands.json";

/// Intent tag identifying which handler a command spec dispatches to.
///
/// # Details
/// The tag set is fixed; `commands.json` can reshape the keyword sets and
/// their priority order but cannot introduce new intents.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Time,
    Date,
    Search,
    Play,
    Math,
    NoteTake,
    NoteRead,
    Help,
    Exit,
    /// Follow-up continuation ("and ...", "also ...") of the previous query.
    Context,
}

/// Represents a single registered command.
///
/// # Details
/// Maps a non-empty set of lowercase trigger phrases to an intent tag.
/// Specs are immutable once the registry is built.
#[derive(Clone, Debug, Deserialize)]
pub struct CommandSpec {
    /// Lowercase trigger phrases, any of which activates this command.
    pub keywords: Vec<String>,
    /// Intent tag dispatched when a trigger phrase matches.
    pub intent: Intent,
}

/// Container for the ordered command registry.
///
/// # Details
/// Registration order is the priority order: when trigger phrases from two
/// specs both occur in an utterance, the earlier-registered spec wins. This
/// is the documented tie-break policy, not an accident - "what is" must
/// resolve to search even though later specs could plausibly match too.
#[derive(Clone, Debug, Deserialize)]
pub struct CommandsConfig {
    /// Registered command specs in priority order.
    pub commands: Vec<CommandSpec>,
}

/// Loads the command registry, preferring `commands.json` over defaults.
///
/// # Details
/// Reads and parses the commands file from the current directory. Falls
/// back to the baked-in registry when the file is missing, malformed, or
/// contains a spec with an empty keyword set.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `CommandsConfig` - Loaded or default command registry.
pub fn load_registry() -> CommandsConfig {
    load_registry_from_file().unwrap_or_else(|err| {
        tracing::debug!("using default commands ({}): {}", COMMANDS_FILE, err);
        default_registry()
    })
}

/// Loads the registry from the JSON file.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `Ok(CommandsConfig)` - Successfully parsed and validated registry.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if any spec
/// carries an empty keyword set.
fn load_registry_from_file() -> Result<CommandsConfig> {
    let content = fs::read_to_string(COMMANDS_FILE)
        .with_context(|| format!("Failed to read {}", COMMANDS_FILE))?;
    let config: CommandsConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", COMMANDS_FILE))?;
    if config.commands.iter().any(|spec| spec.keywords.is_empty()) {
        anyhow::bail!("{} contains a command with no keywords", COMMANDS_FILE);
    }
    Ok(config)
}

/// Provides the baked-in registry used when `commands.json` is unavailable.
///
/// # Details
/// Keyword sets are deliberately permissive substrings: low false-negative
/// rate at the cost of false positives (the word "and" inside an unrelated
/// sentence triggers the continuation intent). That trade-off is a known
/// limitation of the matching tier, not something the registry papers over.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `CommandsConfig` - Default registry in priority order.
pub fn default_registry() -> CommandsConfig {
    let table: [(&[&str], Intent); 10] = [
        (&["time", "current time", "what time"], Intent::Time),
        (&["date", "what day", "todays date", "current date"], Intent::Date),
        (
            &["search", "tell me about", "who is", "what is", "define"],
            Intent::Search,
        ),
        (&["play", "song", "music"], Intent::Play),
        (
            &["calculate", "math", "plus", "minus", "times", "divided"],
            Intent::Math,
        ),
        (&["take a note", "note this", "write down"], Intent::NoteTake),
        (
            &["read my notes", "read notes", "what are my notes"],
            Intent::NoteRead,
        ),
        (&["help", "what can you do", "capabilities"], Intent::Help),
        (&["stop", "exit", "quit", "bye", "goodbye"], Intent::Exit),
        (&["and", "also"], Intent::Context),
    ];
    CommandsConfig {
        commands: table
            .iter()
            .map(|(keywords, intent)| CommandSpec {
                keywords: keywords.iter().map(|phrase| phrase.to_string()).collect(),
                intent: *intent,
            })
            .collect(),
    }
}

/// Finds the matching command for the given normalized text.
///
/// # Details
/// Iterates specs in registration order; a spec matches when any of its
/// trigger phrases occurs as a substring of the input. The first matching
/// spec wins. The caller is expected to pass lowercased, trimmed text.
///
/// # Arguments
/// * `registry` - The command registry to search through.
/// * `text` - The user's normalized utterance.
///
/// # Returns
/// * `Some(&CommandSpec)` - The first matching command in priority order.
/// * `None` - No trigger phrase occurred in the text.
pub fn find_command<'a>(registry: &'a CommandsConfig, text: &str) -> Option<&'a CommandSpec> {
    registry.commands.iter().find(|spec| {
        spec.keywords
            .iter()
            .any(|keyword| text.contains(keyword.as_str()))
    })
}
