/*
 * @file dispatcher.rs
 * @brief Action handlers for each recognised intent
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

//! Command dispatch.
//!
//! [`Dispatcher::dispatch`] classifies an utterance with the rule table in
//! [`crate::commands`], runs the matching handler and queues the reply for
//! speech. Terminal replies are not queued here: the session loop speaks
//! them itself just before it stops.

use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};

use chrono::Local;
use tracing::{debug, warn};

use crate::chat::ConversationModel;
use crate::commands::{self, Intent, OpenTarget};
use crate::config::AppConfig;
use crate::error::{AssistantError, Result};
use crate::knowledge::KnowledgeLookup;
use crate::normalize::Utterance;
use crate::notes::NoteStore;
use crate::platform::Launcher;
use crate::speech::Speaker;

/// Reply to an empty utterance.
pub const EMPTY_REPLY: &str = "I didn't catch that.";

/// Spoken when nothing else could handle the utterance.
pub const HELP_MESSAGE: &str = "I can help with web search, Wikipedia, opening apps, playing music, \
    and system info. Try: 'search', 'open youtube', 'time', or 'wikipedia <topic>'";

/// Displayed when nothing else could handle the utterance.
pub const FALLBACK_DISPLAY: &str = "I didn't understand that. Try asking something else.";

pub const FAREWELL: &str = "Shutting down. Have a good day, sir.";

const LOOKUP_CLARIFICATION: &str = "Ask me who or what to search on Wikipedia.";

const NOTE_CLARIFICATION: &str = "What should I note?";

/// Outcome of one dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchResult {
    /// Text for the synthesizer.
    pub spoken_text: String,
    /// Text for the console.
    pub display_text: String,
    /// The session should stop after speaking `spoken_text`.
    pub terminal: bool,
}

impl DispatchResult {
    fn reply(spoken: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            spoken_text: spoken.into(),
            display_text: display.into(),
            terminal: false,
        }
    }

    /// Same text for voice and console.
    fn say(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::reply(text.clone(), text)
    }

    fn terminal(spoken: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            terminal: true,
            ..Self::reply(spoken, display)
        }
    }
}

/// Runs action handlers against the external collaborators.
pub struct Dispatcher {
    speaker: Speaker,
    lookup: Arc<dyn KnowledgeLookup>,
    chat: Option<Arc<dyn ConversationModel>>,
    launcher: Arc<dyn Launcher>,
    notes: NoteStore,
    sites: BTreeMap<String, String>,
    music_url: String,
    lookup_sentences: usize,
    shutdown_delay: Duration,
}

impl Dispatcher {
    /// Wires a dispatcher from configuration and collaborators.
    ///
    /// # Arguments
    /// * `config` - Supplies the site map, music URL, note path and limits.
    /// * `speaker` - Queue for spoken replies.
    /// * `lookup` - Knowledge lookup provider.
    /// * `chat` - Conversational model, when one is configured.
    /// * `launcher` - OS integration.
    pub fn new(
        config: &AppConfig,
        speaker: Speaker,
        lookup: Arc<dyn KnowledgeLookup>,
        chat: Option<Arc<dyn ConversationModel>>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            speaker,
            lookup,
            chat,
            launcher,
            notes: NoteStore::new(&config.notes_path),
            sites: config.sites.clone(),
            music_url: config.music_url.clone(),
            lookup_sentences: config.lookup_sentences,
            shutdown_delay: config.shutdown_delay(),
        }
    }

    /// Handles one utterance and queues the non-terminal reply for speech.
    pub async fn dispatch(&self, utterance: &Utterance) -> DispatchResult {
        let intent = commands::classify(utterance.text());
        debug!(?intent, source = ?utterance.source(), "dispatching");
        let result = self.handle(intent).await;
        if !result.terminal {
            self.speaker.speak(result.spoken_text.as_str());
        }
        result
    }

    async fn handle(&self, intent: Intent) -> DispatchResult {
        match intent {
            Intent::Empty => DispatchResult::say(EMPTY_REPLY),
            Intent::Exit => DispatchResult::terminal(FAREWELL, "Exiting..."),
            Intent::Time => {
                let now = Local::now().format("%I:%M %p").to_string();
                DispatchResult::reply(format!("The time is {}", now), format!("Time: {}", now))
            }
            Intent::Date => {
                let today = Local::now().format("%A, %B %d, %Y").to_string();
                DispatchResult::reply(format!("Today is {}", today), format!("Date: {}", today))
            }
            Intent::Lookup { query } => self.lookup(&query).await,
            Intent::Open { target } => self.open(&target),
            Intent::Search { query } => self.search(&query),
            Intent::Play { target } => self.play(target.as_deref()),
            Intent::ShutdownComputer => self.shutdown_computer(),
            Intent::Note { text } => self.note(&text),
            Intent::Unmatched { text } => self.fallback(&text).await,
        }
    }

    async fn lookup(&self, query: &str) -> DispatchResult {
        let query = match require(query, "lookup query") {
            Ok(query) => query,
            Err(err) => return clarify(err, LOOKUP_CLARIFICATION),
        };
        self.speaker.speak(format!("Searching Wikipedia for {}", query));
        DispatchResult::say(self.lookup.summary(query, self.lookup_sentences).await)
    }

    fn open(&self, target: &str) -> DispatchResult {
        match commands::resolve_open_target(target, &self.sites) {
            OpenTarget::Url(url) => match self.launcher.open_url(&url) {
                Ok(()) => DispatchResult::reply(
                    format!("Opening {}", target),
                    format!("Opened {}", url),
                ),
                Err(err) => launch_failed(target, err),
            },
            OpenTarget::Site { name, url } => match self.launcher.open_url(&url) {
                Ok(()) => DispatchResult::reply(
                    format!("Opening {}", name),
                    format!("Opened {}", name),
                ),
                Err(err) => launch_failed(&name, err),
            },
            OpenTarget::Unrecognized(target) => DispatchResult::reply(
                format!("I don't know how to open {}.", target),
                format!("Unrecognized open target: {}", target),
            ),
        }
    }

    /// `query` is never blank: utterances are trimmed before the
    /// `"search "` prefix test, so some text always follows it.
    fn search(&self, query: &str) -> DispatchResult {
        match self.launcher.open_url(&commands::search_url(query)) {
            Ok(()) => DispatchResult::reply(
                format!("Here are the Google results for {}", query),
                format!("Searched Google for: {}", query),
            ),
            Err(err) => launch_failed("the search results", err),
        }
    }

    /// Plays a local file or folder when it exists, otherwise the music site.
    fn play(&self, target: Option<&str>) -> DispatchResult {
        if let Some(target) = target.filter(|t| Path::new(t).exists()) {
            return match self.launcher.open_path(Path::new(target)) {
                Ok(()) => DispatchResult::say(format!("Playing {}", target)),
                Err(err) => launch_failed(target, err),
            };
        }
        match self.launcher.open_url(&self.music_url) {
            Ok(()) => DispatchResult::reply("Opening YouTube Music", "Opened YouTube Music"),
            Err(err) => launch_failed("YouTube Music", err),
        }
    }

    fn shutdown_computer(&self) -> DispatchResult {
        match self.launcher.shutdown(self.shutdown_delay) {
            Ok(()) => DispatchResult::terminal(
                "Shutting down the computer now. Goodbye.",
                "Shutdown initiated.",
            ),
            Err(err) => {
                warn!(error = %err, "shutdown failed");
                DispatchResult::reply(
                    "I couldn't shut down the computer.",
                    format!("Shutdown failed: {:#}", err),
                )
            }
        }
    }

    fn note(&self, text: &str) -> DispatchResult {
        let text = match require(text, "note text") {
            Ok(text) => text,
            Err(err) => return clarify(err, NOTE_CLARIFICATION),
        };
        match self.notes.append(text) {
            Ok(_) => DispatchResult::reply("Noted.", format!("Noted: {}", text)),
            Err(err) => {
                warn!(error = %err, "note write failed");
                DispatchResult::reply(
                    "I couldn't save that note.",
                    format!("Note failed: {:#}", err),
                )
            }
        }
    }

    /// Conversational model first, then the fixed help message.
    async fn fallback(&self, text: &str) -> DispatchResult {
        if let Some(chat) = &self.chat {
            self.speaker.speak("Thinking...");
            if let Some(reply) = chat.reply(text).await {
                return DispatchResult::say(reply);
            }
        }
        DispatchResult::reply(HELP_MESSAGE, FALLBACK_DISPLAY)
    }
}

/// Rejects a blank handler argument.
fn require<'a>(arg: &'a str, what: &'static str) -> Result<&'a str> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(AssistantError::EmptyArgument(what))
    } else {
        Ok(arg)
    }
}

fn clarify(err: AssistantError, prompt: &str) -> DispatchResult {
    debug!(reason = %err, "asking for clarification");
    DispatchResult::say(prompt)
}

fn launch_failed(what: &str, err: anyhow::Error) -> DispatchResult {
    warn!(error = %err, what, "launch failed");
    DispatchResult::reply(
        format!("I couldn't open {}.", what),
        format!("Failed to open {}: {:#}", what, err),
    )
}
