//! Text-to-speech output.
//!
//! [`SpeechOutput::start`] hands the synthesis engine to one dedicated
//! consumer thread. [`Speaker::speak`] only enqueues, so the session loop never
//! waits on audio, and texts are played one at a time in submission order.

use std::{
    path::PathBuf,
    process::Command,
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::Instant,
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::error::AssistantError;
use crate::platform::Platform;

/// Something that can turn text into audible speech, blocking until done.
pub trait Synthesizer: Send {
    fn say(&mut self, text: &str) -> Result<()>;
}

/// Speaks through the platform's synthesizer program.
///
/// `say` on macOS, `espeak` on Linux, System.Speech through PowerShell on
/// Windows.
#[derive(Clone, Debug)]
pub struct SystemVoice {
    platform: Platform,
    program: PathBuf,
    rate: u32,
    voice: Option<String>,
}

impl SystemVoice {
    /// Locates the synthesizer program for this platform.
    ///
    /// # Errors
    /// Returns [`AssistantError::DependencyMissing`] when the program is not on
    /// `PATH`; the assistant cannot run without speech output.
    pub fn detect(rate: u32, voice: Option<String>) -> Result<Self, AssistantError> {
        let platform = Platform::current();
        let name = synthesizer_program(platform);
        let program = which::which(name).map_err(|_| {
            AssistantError::DependencyMissing(format!(
                "speech synthesizer `{}` was not found on PATH",
                name
            ))
        })?;
        Ok(Self {
            platform,
            program,
            rate,
            voice,
        })
    }
}

impl Synthesizer for SystemVoice {
    fn say(&mut self, text: &str) -> Result<()> {
        let args = synthesizer_args(self.platform, self.rate, self.voice.as_deref(), text);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;
        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}",
                self.program.display(),
                output.status
            );
        }
        Ok(())
    }
}

fn synthesizer_program(platform: Platform) -> &'static str {
    match platform {
        Platform::MacOs => "say",
        Platform::Windows => "powershell",
        Platform::Linux => "espeak",
    }
}

/// Command-line arguments for one utterance at `rate` words per minute.
fn synthesizer_args(platform: Platform, rate: u32, voice: Option<&str>, text: &str) -> Vec<String> {
    match platform {
        Platform::MacOs | Platform::Linux => {
            let rate_flag = if platform == Platform::MacOs { "-r" } else { "-s" };
            let mut args = vec![rate_flag.to_string(), rate.to_string()];
            if let Some(voice) = voice {
                args.push("-v".to_string());
                args.push(voice.to_string());
            }
            args.push(text.to_string());
            args
        }
        Platform::Windows => {
            // SAPI rates run from -10 to 10 around a default of roughly 160 wpm.
            let sapi_rate = ((rate as i64 - 160) / 20).clamp(-10, 10);
            let mut script = String::from(
                "Add-Type -AssemblyName System.Speech; \
                 $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; ",
            );
            script.push_str(&format!("$s.Rate = {}; ", sapi_rate));
            if let Some(voice) = voice {
                script.push_str(&format!("$s.SelectVoice('{}'); ", voice.replace('\'', "''")));
            }
            script.push_str(&format!("$s.Speak('{}')", text.replace('\'', "''")));
            vec!["-NoProfile".to_string(), "-Command".to_string(), script]
        }
    }
}

/// One queued speak request.
#[derive(Debug)]
struct SpeechTask {
    text: String,
    submitted_at: Instant,
}

enum SpeechCommand {
    Say(SpeechTask),
    Stop,
}

/// Cloneable, non-blocking handle for queueing speech.
#[derive(Clone)]
pub struct Speaker {
    tx: Sender<SpeechCommand>,
}

impl Speaker {
    /// Queues `text` for playback and returns immediately.
    ///
    /// Blank text is ignored. Text submitted after the output has shut down
    /// is dropped with a debug log.
    pub fn speak(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("ignoring empty speech request");
            return;
        }
        let task = SpeechTask {
            text,
            submitted_at: Instant::now(),
        };
        if self.tx.send(SpeechCommand::Say(task)).is_err() {
            debug!("speech output already stopped");
        }
    }
}

/// Owner of the speech consumer thread.
pub struct SpeechOutput {
    speaker: Speaker,
    worker: Option<JoinHandle<()>>,
}

impl SpeechOutput {
    /// Moves `engine` onto a new consumer thread and starts accepting speech.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn start<S>(engine: S) -> Result<Self>
    where
        S: Synthesizer + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("speech".to_string())
            .spawn(move || run_consumer(rx, engine))
            .context("Failed to spawn speech thread")?;
        Ok(Self {
            speaker: Speaker { tx },
            worker: Some(worker),
        })
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker.clone()
    }

    pub fn speak(&self, text: impl Into<String>) {
        self.speaker.speak(text);
    }

    /// Plays everything already queued, then stops the consumer thread.
    pub fn shutdown(mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("speech thread panicked");
            }
        }
    }

    fn stop(&self) {
        let _ = self.speaker.tx.send(SpeechCommand::Stop);
    }
}

impl Drop for SpeechOutput {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

/// Plays queued texts one at a time until told to stop.
fn run_consumer<S: Synthesizer>(rx: Receiver<SpeechCommand>, mut engine: S) {
    while let Ok(SpeechCommand::Say(task)) = rx.recv() {
        debug!(
            queued_ms = task.submitted_at.elapsed().as_millis() as u64,
            chars = task.text.len(),
            "speaking"
        );
        if let Err(err) = engine.say(&task.text) {
            warn!(error = %err, "TTS error");
        }
    }
    debug!("speech consumer stopped");
}
