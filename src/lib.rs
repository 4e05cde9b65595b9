/*
 * @file lib.rs
 * @brief Jarvis library root
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

//! Jarvis - a voice and text command assistant.
//!
//! This library provides a hands-free assistant that:
//! - matches utterances against a fixed set of keyword-triggered commands
//! - carries conversational context for "also/and" follow-up searches
//! - serializes all spoken output through a single speech queue
//! - alternates between speaking and one-shot microphone listening on a
//!   background loop
//!
//! Speech recognition runs locally through Whisper, speech synthesis uses
//! the macOS `say` command, encyclopedia lookups go to Wikipedia, and
//! media playback is delegated to YouTube via the platform opener.
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//! use jarvis::assistant;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dotenv::dotenv().ok();
//!     assistant::run_assistant().await
//! }
//! ```

pub mod assistant;
pub mod audio;
pub mod commands;
pub mod config;
pub mod frontend;
pub mod lookup;
pub mod mathexpr;
pub mod notes;
pub mod player;
pub mod processor;
pub mod speech;
pub mod stt;
