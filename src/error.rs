/*
 * @file error.rs
 * @brief Error taxonomy shared by capture, dispatch and startup
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

//! Error types for the assistant.
//!
//! Capture and recognition failures degrade to "no utterance"; external API
//! failures become user-visible text; only [`AssistantError::DependencyMissing`]
//! is fatal, and only at startup.

use std::time::Duration;

/// Top-level error type for the command assistant.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// No speech started inside the listen window.
    #[error("listen timed out: no speech detected within {0:?}")]
    AcquisitionTimeout(Duration),

    /// Audio was captured but could not be turned into text.
    #[error(transparent)]
    RecognitionFailure(#[from] RecognitionFailure),

    /// No usable microphone.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// A capability the process cannot run without.
    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    /// Knowledge lookup, conversational model or transcription service failure.
    #[error("{service} request failed: {reason}")]
    ExternalApi {
        /// Short name of the remote collaborator.
        service: &'static str,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A handler needed a query or note body and got none.
    #[error("missing {0}")]
    EmptyArgument(&'static str),
}

/// Why recognition of captured audio failed.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionFailure {
    #[error("could not understand audio")]
    Unintelligible,
    #[error("speech recognition service is unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AssistantError {
    /// Builds an [`AssistantError::ExternalApi`] from any displayable reason.
    pub fn external(service: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::ExternalApi {
            service,
            reason: reason.to_string(),
        }
    }

    /// Whether the session loop should treat this as "no utterance" and keep going.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DependencyMissing(_))
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
