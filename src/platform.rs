/*
 * @file platform.rs
 * @brief Browser, file opener and shutdown integration
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

//! Operating-system integration.
//!
//! The dispatcher reaches the OS only through [`Launcher`], so tests can
//! record what would have been opened instead of spawning processes.
//!
//! Paths handed to [`Launcher::open_path`] come straight from the user's
//! utterance and are passed to the platform opener unvalidated. That is
//! acceptable for a single trusted local user and nothing more.

use std::{
    path::Path,
    process::{Command, Stdio},
    time::Duration,
};

use anyhow::{Context, Result};
use tracing::info;

/// Host operating system family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

/// Side effects the action handlers may trigger.
pub trait Launcher: Send + Sync {
    /// Opens `url` in the default browser.
    fn open_url(&self, url: &str) -> Result<()>;

    /// Opens a file or folder with the default application.
    fn open_path(&self, path: &Path) -> Result<()>;

    /// Schedules a system power-off after `delay`.
    fn shutdown(&self, delay: Duration) -> Result<()>;
}

/// [`Launcher`] backed by the platform's own commands.
#[derive(Clone, Copy, Debug)]
pub struct SystemLauncher {
    platform: Platform,
}

impl SystemLauncher {
    pub fn new() -> Self {
        Self {
            platform: Platform::current(),
        }
    }

    fn spawn(&self, (program, args): (&'static str, Vec<String>)) -> Result<()> {
        Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to run {}", program))?;
        Ok(())
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) -> Result<()> {
        info!(url, "opening url");
        self.spawn(opener_command(self.platform, url))
    }

    fn open_path(&self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "opening path");
        self.spawn(opener_command(self.platform, &path.to_string_lossy()))
    }

    fn shutdown(&self, delay: Duration) -> Result<()> {
        info!(delay_secs = delay.as_secs(), "scheduling shutdown");
        let (program, args) = shutdown_command(self.platform, delay);
        let status = Command::new(program)
            .args(&args)
            .status()
            .with_context(|| format!("Failed to run {}", program))?;
        if !status.success() {
            anyhow::bail!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

/// Program and arguments that open `target` with the default handler.
pub fn opener_command(platform: Platform, target: &str) -> (&'static str, Vec<String>) {
    match platform {
        Platform::MacOs => ("open", vec![target.to_string()]),
        // The empty argument is the window title `start` expects first.
        Platform::Windows => (
            "cmd",
            vec![
                "/C".to_string(),
                "start".to_string(),
                String::new(),
                target.to_string(),
            ],
        ),
        Platform::Linux => ("xdg-open", vec![target.to_string()]),
    }
}

/// Shortest power-off delay handed to Windows, so the farewell can still play.
const MIN_WINDOWS_DELAY_SECS: u64 = 5;

/// Program and arguments that power the machine off after `delay`.
///
/// # Details
/// Windows takes the delay in seconds, at least [`MIN_WINDOWS_DELAY_SECS`].
/// Unix `shutdown` only understands whole minutes, so the delay is rounded up
/// to at least one minute and never becomes `now`.
pub fn shutdown_command(platform: Platform, delay: Duration) -> (&'static str, Vec<String>) {
    match platform {
        Platform::Windows => (
            "shutdown",
            vec![
                "/s".to_string(),
                "/t".to_string(),
                delay.as_secs().max(MIN_WINDOWS_DELAY_SECS).to_string(),
            ],
        ),
        Platform::MacOs | Platform::Linux => {
            let minutes = delay.as_secs().div_ceil(60).max(1);
            (
                "sudo",
                vec![
                    "shutdown".to_string(),
                    "-h".to_string(),
                    format!("+{}", minutes),
                ],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opener_uses_platform_tool() {
        assert_eq!(
            opener_command(Platform::Linux, "https://github.com"),
            ("xdg-open", vec!["https://github.com".to_string()])
        );
        assert_eq!(opener_command(Platform::MacOs, "/tmp/a.mp3").0, "open");
        let (program, args) = opener_command(Platform::Windows, "C:\\music");
        assert_eq!(program, "cmd");
        assert_eq!(args.last().map(String::as_str), Some("C:\\music"));
    }

    #[test]
    fn windows_shutdown_uses_seconds() {
        let (program, args) = shutdown_command(Platform::Windows, Duration::from_secs(5));
        assert_eq!(program, "shutdown");
        assert_eq!(args, vec!["/s", "/t", "5"]);
    }

    #[test]
    fn unix_shutdown_rounds_up_to_minutes() {
        let (_, args) = shutdown_command(Platform::Linux, Duration::from_secs(5));
        assert_eq!(args, vec!["shutdown", "-h", "+1"]);
        let (_, args) = shutdown_command(Platform::Linux, Duration::from_secs(61));
        assert_eq!(args, vec!["shutdown", "-h", "+2"]);
    }

    #[test]
    fn zero_delay_still_leaves_time_for_the_farewell() {
        let (_, args) = shutdown_command(Platform::MacOs, Duration::ZERO);
        assert_eq!(args, vec!["shutdown", "-h", "+1"]);
        let (_, args) = shutdown_command(Platform::Windows, Duration::ZERO);
        assert_eq!(args, vec!["/s", "/t", "5"]);
    }
}
