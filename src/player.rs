//! Media playback collaborator.
//!
//! Playback is fire-and-forget: the assistant announces what it is doing,
//! hands the query to the launcher, and never waits for the player. The
//! production launcher opens a YouTube search for the query in the default
//! browser.

use std::process::Command;
use std::sync::Mutex;

use anyhow::{Context, Result};

/// YouTube search URL prefix.
const SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";

/// Narrow interface to the playback service.
pub trait PlaybackLauncher: Send + Sync {
    /// Launches playback for the query.
    ///
    /// # Errors
    /// Returns an error when the launcher cannot be started; callers
    /// convert this into a spoken apology.
    fn launch(&self, query: &str) -> Result<()>;
}

/// Launcher that opens a YouTube search through the platform opener.
pub struct YoutubeLauncher;

impl PlaybackLauncher for YoutubeLauncher {
    fn launch(&self, query: &str) -> Result<()> {
        let url = format!("{}{}", SEARCH_URL, urlencoding::encode(query));
        open_url(&url)
    }
}

fn open_url(url: &str) -> Result<()> {
    if cfg!(test) {
        if *FORCE_ERROR.lock().unwrap() {
            anyhow::bail!("Forced failure for testing");
        }
        return Ok(());
    }

    Command::new(opener_command())
        .arg(url)
        .spawn()
        .with_context(|| format!("Failed to open {}", url))?;
    Ok(())
}

/// Returns the platform URL opener binary name.
fn opener_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

#[cfg_attr(not(test), allow(dead_code))]
static FORCE_ERROR: Mutex<bool> = Mutex::new(false);
