/*
 * @file capture.rs
 * @brief Speech capture provider and transcription client
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

//! Speech capture.
//!
//! The session loop asks a [`SpeechCapture`] for one utterance at a time. Any
//! failure (timeout, unintelligible audio, dead service, missing microphone)
//! comes back as an [`AssistantError`] that the loop reports and then
//! treats as "nothing was said".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{AssistantError, RecognitionFailure, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces recognized lowercase text from a bounded listen.
#[async_trait]
pub trait SpeechCapture: Send {
    /// Whether a microphone is selected and `listen` can be attempted.
    fn is_ready(&self) -> bool;

    /// Names of the available input devices, in index order.
    fn devices(&self) -> Result<Vec<String>>;

    /// Selects the input device at `index`, returning its name.
    fn select(&mut self, index: usize) -> Result<String>;

    /// Listens once and returns the recognized text in lowercase.
    async fn listen(&mut self) -> Result<String>;
}

/// Capture used when the binary is built without microphone support.
#[derive(Debug, Default)]
pub struct UnavailableCapture;

const NO_MICROPHONE_SUPPORT: &str = "this build has no microphone support";

#[async_trait]
impl SpeechCapture for UnavailableCapture {
    fn is_ready(&self) -> bool {
        false
    }

    fn devices(&self) -> Result<Vec<String>> {
        Err(AssistantError::DeviceUnavailable(NO_MICROPHONE_SUPPORT.to_string()))
    }

    fn select(&mut self, _index: usize) -> Result<String> {
        Err(AssistantError::DeviceUnavailable(NO_MICROPHONE_SUPPORT.to_string()))
    }

    async fn listen(&mut self) -> Result<String> {
        Err(AssistantError::DeviceUnavailable(NO_MICROPHONE_SUPPORT.to_string()))
    }
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperApiTranscriber {
    /// Creates a transcriber for `model` under `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            endpoint: format!("{}/audio/transcriptions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }

    /// Transcribes a WAV file held in memory.
    ///
    /// # Errors
    /// * [`RecognitionFailure::ServiceUnavailable`] - Transport or HTTP failure.
    /// * [`RecognitionFailure::Unintelligible`] - The service heard no words.
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        let file = Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")
            .map_err(service_unavailable)?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "json");
        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response: TranscriptionResponse = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(service_unavailable)?
            .json()
            .await
            .map_err(service_unavailable)?;
        let text = response.text.trim().to_lowercase();
        if text.is_empty() {
            return Err(RecognitionFailure::Unintelligible.into());
        }
        debug!(text = %text, "transcribed");
        Ok(text)
    }
}

fn service_unavailable(err: reqwest::Error) -> AssistantError {
    RecognitionFailure::ServiceUnavailable(err.to_string()).into()
}

/// Builds the capture provider for this build and configuration.
///
/// # Errors
/// Returns an error if the transcription client cannot be built.
pub fn from_config(config: &AppConfig) -> anyhow::Result<Box<dyn SpeechCapture>> {
    #[cfg(feature = "microphone")]
    {
        let transcriber = WhisperApiTranscriber::new(
            &config.transcription_url,
            &config.transcription_model,
            config.transcription_api_key.clone(),
        )?;
        Ok(Box::new(microphone::MicrophoneCapture::with_default_device(
            transcriber,
            config.listen_timeout(),
            config.phrase_time_limit(),
        )))
    }
    #[cfg(not(feature = "microphone"))]
    {
        let _ = config;
        Ok(Box::new(UnavailableCapture))
    }
}

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneCapture;

#[cfg(feature = "microphone")]
mod microphone {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{SpeechCapture, WhisperApiTranscriber};
    use crate::audio;
    use crate::error::{AssistantError, Result};

    /// Live microphone capture transcribed through a Whisper API.
    pub struct MicrophoneCapture {
        device: Option<usize>,
        transcriber: WhisperApiTranscriber,
        timeout: Duration,
        phrase_limit: Duration,
    }

    impl MicrophoneCapture {
        /// Starts with the system default input device, if there is one.
        pub fn with_default_device(
            transcriber: WhisperApiTranscriber,
            timeout: Duration,
            phrase_limit: Duration,
        ) -> Self {
            Self {
                device: audio::default_input_index(),
                transcriber,
                timeout,
                phrase_limit,
            }
        }
    }

    #[async_trait]
    impl SpeechCapture for MicrophoneCapture {
        fn is_ready(&self) -> bool {
            self.device.is_some()
        }

        fn devices(&self) -> Result<Vec<String>> {
            audio::input_device_names()
        }

        fn select(&mut self, index: usize) -> Result<String> {
            let names = audio::input_device_names()?;
            let name = names.get(index).cloned().ok_or_else(|| {
                AssistantError::DeviceUnavailable(format!("no input device {}", index))
            })?;
            self.device = Some(index);
            Ok(name)
        }

        async fn listen(&mut self) -> Result<String> {
            let index = self
                .device
                .ok_or_else(|| AssistantError::DeviceUnavailable("no microphone selected".into()))?;
            let (timeout, phrase_limit) = (self.timeout, self.phrase_limit);
            let samples = tokio::task::spawn_blocking(move || {
                audio::record_phrase(index, timeout, phrase_limit)
            })
            .await
            .map_err(|e| AssistantError::DeviceUnavailable(e.to_string()))??;
            let wav = audio::encode_wav(&samples)
                .map_err(|e| AssistantError::DeviceUnavailable(e.to_string()))?;
            self.transcriber.transcribe(wav).await
        }
    }
}
