/*
 * @file assistant.rs
 * @brief Interactive session loop and runtime bootstrap
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

//! Session loop.
//!
//! Each cycle asks how the user wants to give a command, acquires one
//! utterance, dispatches it and prints the result. The loop stops on the
//! quit choice, end of input, or a terminal [`DispatchResult`].

use std::{
    future::Future,
    io::{self, BufRead, Write},
    sync::Arc,
    thread,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::{self, SpeechCapture};
use crate::chat;
use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::knowledge::WikipediaClient;
use crate::normalize::{InputSource, Utterance};
use crate::platform::SystemLauncher;
use crate::speech::{Speaker, SpeechOutput, SystemVoice};

pub const WELCOME: &str = "Hello sir, Jarvis at your service. Say a command or type it.";

pub const GOODBYE: &str = "Goodbye, sir.";

const INPUT_MENU: &str = "\nChoose input method: (1) Speak  (2) Type  (3) Quit";

const CHOICE_PROMPT: &str = "Your choice (1/2/3): ";

const COMMAND_PROMPT: &str = "Type your command: ";

const NO_SPEECH: &str = "No speech detected. Try typing instead.";

const UNREADABLE_LINE: &str = "Could not read that input as text. Please try again.";

/// Line-oriented user interface.
#[async_trait]
pub trait Console: Send {
    /// Shows `prompt` and waits for one line.
    ///
    /// # Returns
    /// * `Ok(Some(line))` - One line without its terminator.
    /// * `Ok(None)` - End of input.
    /// * `Err(_)` - The line could not be read; `InvalidData` means only this
    ///   line is lost and the next read may succeed.
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn print(&mut self, line: &str);
}

type LineReceiver = mpsc::UnboundedReceiver<io::Result<String>>;

/// Console on the process's stdin and stdout.
///
/// Stdin is read with blocking IO on a dedicated thread and forwarded over a
/// channel. A read still pending when the session ends is simply abandoned,
/// so it never holds the runtime open.
pub struct StdConsole {
    lines: LineReceiver,
}

impl StdConsole {
    /// Starts the stdin reader thread.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("stdin".to_string())
            .spawn(move || forward_lines(io::stdin().lock(), &tx))
            .context("Failed to spawn stdin reader")?;
        Ok(Self { lines: rx })
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        let _ = io::stdout().flush();
        self.lines.recv().await.transpose()
    }

    fn print(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Sends every line of `reader` until end of input or until nobody listens.
///
/// A line that is not valid UTF-8 is sent as an `InvalidData` error and
/// reading carries on with the next line.
fn forward_lines<R: BufRead>(mut reader: R, tx: &mpsc::UnboundedSender<io::Result<String>>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let line = match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => String::from_utf8(strip_line_ending(&buf).to_vec())
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(Err(err));
                return;
            }
        };
        if tx.send(line).is_err() {
            return;
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// What one console prompt produced.
enum Reply {
    Line(String),
    /// The line was lost; the session keeps going.
    Unreadable,
    Closed,
}

/// How the user chose to give the next command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputMethod {
    Speak,
    Type,
    Quit,
}

impl InputMethod {
    /// "1" speaks, "3" quits, anything else is typed input.
    fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => Self::Speak,
            "3" => Self::Quit,
            _ => Self::Type,
        }
    }
}

/// One interactive session.
pub struct Session<C: Console> {
    console: C,
    dispatcher: Dispatcher,
    speaker: Speaker,
    capture: Box<dyn SpeechCapture>,
    wake_word: String,
}

impl<C: Console> Session<C> {
    pub fn new(
        console: C,
        dispatcher: Dispatcher,
        speaker: Speaker,
        capture: Box<dyn SpeechCapture>,
        wake_word: impl Into<String>,
    ) -> Self {
        Self {
            console,
            dispatcher,
            speaker,
            capture,
            wake_word: wake_word.into(),
        }
    }

    /// Prints and speaks the greeting.
    pub fn welcome(&mut self) {
        self.console.print(WELCOME);
        self.speaker.speak(WELCOME);
    }

    /// Runs cycles until the session stops.
    pub async fn run(&mut self) {
        while self.process_iteration().await {}
        info!("session stopped");
    }

    /// Executes one acquire-dispatch-display cycle.
    ///
    /// # Returns
    /// * `true` to keep looping, `false` once the session has stopped.
    pub async fn process_iteration(&mut self) -> bool {
        self.console.print(INPUT_MENU);
        let choice = match self.ask(CHOICE_PROMPT).await {
            Reply::Line(choice) => choice,
            Reply::Unreadable => return true,
            Reply::Closed => return self.quit(),
        };
        let utterance = match InputMethod::from_choice(&choice) {
            InputMethod::Quit => return self.quit(),
            InputMethod::Speak => match self.listen().await {
                Some(utterance) => utterance,
                None => {
                    self.console.print(NO_SPEECH);
                    return true;
                }
            },
            InputMethod::Type => match self.ask(COMMAND_PROMPT).await {
                Reply::Line(line) if line.trim().is_empty() => return true,
                Reply::Line(line) => {
                    Utterance::new(Some(&line), InputSource::Typed, &self.wake_word)
                }
                Reply::Unreadable => return true,
                Reply::Closed => return self.quit(),
            },
        };

        self.console.print(&format!("Processing: {}", utterance.text()));
        let result = self.dispatcher.dispatch(&utterance).await;
        self.console.print(&format!("Result: {}", result.display_text));
        if result.terminal {
            self.speaker.speak(result.spoken_text);
            return false;
        }
        true
    }

    fn quit(&mut self) -> bool {
        self.console.print("Goodbye.");
        self.speaker.speak(GOODBYE);
        false
    }

    fn interrupted(&mut self) {
        self.console.print("\nInterrupted. Exiting...");
        self.speaker.speak(GOODBYE);
    }

    /// Reads one line, reporting an unreadable line and moving on.
    async fn ask(&mut self, prompt: &str) -> Reply {
        match self.console.read_line(prompt).await {
            Ok(Some(line)) => Reply::Line(line),
            Ok(None) => Reply::Closed,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                debug!(error = %err, "skipping unreadable input line");
                self.console.print(UNREADABLE_LINE);
                Reply::Unreadable
            }
            Err(err) => {
                warn!(error = %err, "console read failed");
                Reply::Closed
            }
        }
    }

    /// Acquires one spoken utterance, offering microphone selection first
    /// when none is ready. `None` means nothing usable was heard.
    async fn listen(&mut self) -> Option<Utterance> {
        if !self.capture.is_ready() {
            self.console.print("No microphone was automatically detected.");
            let wants_selection = match self
                .ask("Would you like to select a microphone? (y/N): ")
                .await
            {
                Reply::Line(answer) => answer.trim().eq_ignore_ascii_case("y"),
                Reply::Unreadable | Reply::Closed => false,
            };
            if wants_selection {
                self.select_microphone().await;
            }
        }

        self.console.print("Listening...");
        match self.capture.listen().await {
            Ok(text) => {
                self.console.print(&format!("You said: {}", text));
                Some(Utterance::new(Some(&text), InputSource::Voice, &self.wake_word))
            }
            Err(err) => {
                if err.is_recoverable() {
                    debug!(error = %err, "no utterance captured");
                } else {
                    warn!(error = %err, "speech capture failed");
                }
                self.console.print(&err.to_string());
                None
            }
        }
    }

    /// Lists input devices and lets the user pick one by index.
    async fn select_microphone(&mut self) {
        let names = match self.capture.devices() {
            Ok(names) => names,
            Err(err) => {
                self.console.print(&format!("Could not list microphones: {}", err));
                return;
            }
        };
        if names.is_empty() {
            self.console.print("No microphone devices found.");
            return;
        }
        self.console.print("Available microphone devices:");
        for (index, name) in names.iter().enumerate() {
            self.console.print(&format!("{}: {}", index, name));
        }
        let Reply::Line(choice) = self
            .ask("Select microphone index or press Enter to cancel: ")
            .await
        else {
            return;
        };
        let choice = choice.trim();
        if choice.is_empty() {
            return;
        }
        let selected = choice
            .parse::<usize>()
            .map_err(|_| format!("'{}' is not a device index", choice))
            .and_then(|index| self.capture.select(index).map_err(|err| err.to_string()));
        match selected {
            Ok(name) => self.console.print(&format!("Selected microphone: {}", name)),
            Err(reason) => self
                .console
                .print(&format!("Failed to initialize selected microphone: {}", reason)),
        }
    }
}

/// Builds the runtime from configuration and runs an interactive session.
///
/// # Details
/// Ctrl-C ends the session like a quit; see [`run_until`].
///
/// # Errors
/// Fails before the session starts when configuration is invalid, the
/// speech synthesizer is missing, or a client cannot be built.
pub async fn run_assistant() -> Result<()> {
    let config = AppConfig::load().context("Invalid configuration")?;
    let voice = SystemVoice::detect(config.speech_rate, config.voice.clone())?;
    let output = SpeechOutput::start(voice)?;

    let lookup = Arc::new(WikipediaClient::new(config.wikipedia_api_url.clone())?);
    let chat = chat::from_config(&config)?;
    let capture = capture::from_config(&config)?;
    let dispatcher = Dispatcher::new(
        &config,
        output.speaker(),
        lookup,
        chat,
        Arc::new(SystemLauncher::new()),
    );

    let mut session = Session::new(
        StdConsole::spawn()?,
        dispatcher,
        output.speaker(),
        capture,
        config.wake_word.as_str(),
    );
    session.welcome();
    run_until(session, output, ctrl_c()).await
}

/// Runs `session` until it stops on its own or `interrupt` resolves.
///
/// # Details
/// An interrupt abandons whatever the session was waiting on, prints a
/// notice and queues the farewell. Either way every queued text is played
/// before this returns.
///
/// # Errors
/// Returns an error if the speech thread cannot be joined.
pub async fn run_until<C, F>(
    mut session: Session<C>,
    output: SpeechOutput,
    interrupt: F,
) -> Result<()>
where
    C: Console,
    F: Future<Output = ()>,
{
    let interrupted = tokio::select! {
        _ = session.run() => false,
        _ = interrupt => true,
    };
    if interrupted {
        info!("session interrupted");
        session.interrupted();
    }
    drop(session);

    tokio::task::spawn_blocking(move || output.shutdown())
        .await
        .context("Speech shutdown failed")?;
    Ok(())
}

/// Resolves on Ctrl-C, or never if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}
