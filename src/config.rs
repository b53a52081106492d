/*
 * @file config.rs
 * @brief Runtime configuration loaded from config.json and the environment
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

//! Assistant configuration.
//!
//! Values come from `config.json` (every field optional) and are then
//! overridden by environment variables, which `.env` may populate.

use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;
use tracing::{debug, warn};

/// Default path of the JSON configuration file.
pub const CONFIG_PATH: &str = "config.json";

/// Name the assistant answers to.
const DEFAULT_WAKE_WORD: &str = "jarvis";

/// Words per minute handed to the synthesizer.
const DEFAULT_SPEECH_RATE: u32 = 160;

/// File that receives one line per note.
const DEFAULT_NOTES_PATH: &str = "jarvis_notes.txt";

const DEFAULT_MUSIC_URL: &str = "https://music.youtube.com";

const DEFAULT_SITES: [(&str, &str); 4] = [
    ("youtube", "https://youtube.com"),
    ("google", "https://google.com"),
    ("github", "https://github.com"),
    ("gmail", "https://mail.google.com"),
];

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Backend used for the conversational fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    /// Google Gemini; active only when `GEMINI_API_KEY` is set.
    #[default]
    Gemini,
    /// Local Ollama server.
    Ollama,
    /// Conversational fallback disabled.
    None,
}

impl FromStr for ChatProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("'{}' is not one of gemini, ollama, none", other)),
        }
    }
}

/// Strongly typed representation of `config.json` plus environment overrides.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Token stripped from utterances before dispatch.
    pub wake_word: String,
    pub speech_rate: u32,
    /// Synthesizer voice name; platform default when absent.
    pub voice: Option<String>,
    /// Seconds to wait for speech to begin.
    pub listen_timeout_secs: u64,
    /// Longest phrase recorded once speech has begun.
    pub phrase_time_limit_secs: u64,
    pub notes_path: PathBuf,
    /// Sentence count requested from the knowledge lookup.
    pub lookup_sentences: usize,
    pub wikipedia_api_url: String,
    pub chat_provider: ChatProvider,
    pub gemini_api_url: String,
    pub gemini_model: String,
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,
    /// Base URL of a Whisper-compatible transcription API.
    pub transcription_url: String,
    pub transcription_model: String,
    #[serde(skip)]
    pub transcription_api_key: Option<String>,
    /// Opened by "play music" when no local target is given.
    pub music_url: String,
    /// Named targets for "open <name>", merged over the built-in map.
    pub sites: BTreeMap<String, String>,
    pub shutdown_delay_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            speech_rate: DEFAULT_SPEECH_RATE,
            voice: None,
            listen_timeout_secs: 3,
            phrase_time_limit_secs: 8,
            notes_path: PathBuf::from(DEFAULT_NOTES_PATH),
            lookup_sentences: 2,
            wikipedia_api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            chat_provider: ChatProvider::default(),
            gemini_api_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:3b".to_string(),
            transcription_url: "https://api.groq.com/openai/v1".to_string(),
            transcription_model: "whisper-large-v3-turbo".to_string(),
            transcription_api_key: None,
            music_url: DEFAULT_MUSIC_URL.to_string(),
            sites: default_sites(),
            shutdown_delay_secs: 5,
        }
    }
}

impl AppConfig {
    /// Loads `config.json` (or `$JARVIS_CONFIG`) and applies environment overrides.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] when an override cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env_string("JARVIS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
        let mut config = Self::from_file(&path);
        config.apply_env()?;
        Ok(config)
    }

    /// Reads a configuration file, falling back to defaults.
    ///
    /// # Details
    /// A missing file is the normal case and yields defaults silently. A file
    /// that cannot be read or parsed is reported and also yields defaults so
    /// the assistant can still start.
    ///
    /// # Arguments
    /// * `path` - Location of the JSON configuration file.
    ///
    /// # Returns
    /// * `AppConfig` - Parsed or default configuration.
    pub fn from_file(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config load error");
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(mut config) => {
                config.wake_word = config.wake_word.to_lowercase();
                config.merge_default_sites();
                config
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config parse error");
                Self::default()
            }
        }
    }

    /// Applies environment variable overrides on top of the file values.
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(wake_word) = env_string("JARVIS_WAKE_WORD") {
            self.wake_word = wake_word.to_lowercase();
        }
        if let Some(path) = env_string("JARVIS_NOTES_PATH") {
            self.notes_path = PathBuf::from(path);
        }
        if let Some(rate) = env_parse::<u32>("JARVIS_SPEECH_RATE")? {
            self.speech_rate = rate;
        }
        if let Some(voice) = env_string("JARVIS_VOICE") {
            self.voice = Some(voice);
        }
        if let Some(provider) = env_parse::<ChatProvider>("JARVIS_CHAT_PROVIDER")? {
            self.chat_provider = provider;
        }
        if let Some(model) = env_string("GEMINI_MODEL") {
            self.gemini_model = model;
        }
        if let Some(model) = env_string("OLLAMA_MODEL") {
            self.ollama_model = model;
        }
        self.gemini_api_key = env_string("GEMINI_API_KEY");
        self.transcription_api_key = env_string("GROQ_API_KEY");
        Ok(())
    }

    fn merge_default_sites(&mut self) {
        for (name, url) in DEFAULT_SITES {
            self.sites
                .entry(name.to_string())
                .or_insert_with(|| url.to_string());
        }
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    pub fn phrase_time_limit(&self) -> Duration {
        Duration::from_secs(self.phrase_time_limit_secs)
    }

    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_secs(self.shutdown_delay_secs)
    }
}

fn default_sites() -> BTreeMap<String, String> {
    DEFAULT_SITES
        .iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect()
}

/// Reads a non-blank environment variable.
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(None),
    }
}
