/*
 * @file lib.rs
 * @brief Library root for the Jarvis command assistant
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
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

//! Jarvis, a single-user voice and text command assistant.
//!
//! An utterance is normalized, stripped of the wake word and matched against
//! an ordered rule table. The first matching rule picks a handler, whose reply
//! is printed and queued for speech on a dedicated synthesis thread.
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dotenv::dotenv().ok();
//!     jarvis::assistant::run_assistant().await
//! }
//! ```

pub mod assistant;
#[cfg(feature = "microphone")]
pub mod audio;
pub mod capture;
pub mod chat;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod knowledge;
pub mod normalize;
pub mod notes;
pub mod platform;
pub mod speech;
