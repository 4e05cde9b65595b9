//! UI boundary.
//!
//! The core reports activity through this narrow interface and never
//! learns whether a window, a web page, or a plain console sits behind it.
//! Implementations must not block and must not fail.

use chrono::Local;

/// Conversation log and status sink.
pub trait Frontend: Send + Sync {
    /// Appends one transcript line attributed to a speaker
    /// ("You", "Jarvis", or "System").
    fn log(&self, speaker: &str, message: &str);

    /// Updates the visible status label ("Idle", "Listening...",
    /// "Processing...", "Speaking...", "Error").
    fn set_status(&self, status: &str);
}

/// Console frontend printing timestamped transcript lines.
pub struct ConsoleFrontend;

impl Frontend for ConsoleFrontend {
    fn log(&self, speaker: &str, message: &str) {
        println!("[{}] {}: {}", Local::now().format("%H:%M"), speaker, message);
    }

    fn set_status(&self, status: &str) {
        eprintln!("· {}", status);
    }
}
