/*
 * @file notes.rs
 * @brief Append-only note persistence
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

//! Append-only note store.
//!
//! Each note is one line, `[<ISO-8601 local timestamp>] <text>`. The file is
//! opened, appended to and closed on every write.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use tracing::info;

/// Line-oriented note file.
#[derive(Clone, Debug)]
pub struct NoteStore {
    path: PathBuf,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one note stamped with the current local time.
    ///
    /// # Arguments
    /// * `text` - Note body; must already be non-empty.
    ///
    /// # Returns
    /// * `Ok(String)` - The line that was written, without its newline.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, text: &str) -> Result<String> {
        let line = format_note(&Local::now(), text);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), "note saved");
        Ok(line)
    }
}

/// Formats a note record, `[2025-01-31T09:15:00.123456] text`.
pub fn format_note<Tz>(at: &DateTime<Tz>, text: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("[{}] {}", at.format("%Y-%m-%dT%H:%M:%S%.6f"), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::fs;

    fn assert_note_line(line: &str, text: &str) {
        let (stamp, body) = line
            .strip_prefix('[')
            .and_then(|rest| rest.split_once("] "))
            .unwrap_or_else(|| panic!("malformed note line: {line:?}"));
        NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f")
            .unwrap_or_else(|e| panic!("bad timestamp {stamp:?}: {e}"));
        assert_eq!(body, text);
    }

    #[test]
    fn format_note_uses_iso_timestamp() {
        let at = Local.with_ymd_and_hms(2025, 1, 31, 9, 15, 0).unwrap();
        assert_eq!(format_note(&at, "buy milk"), "[2025-01-31T09:15:00.000000] buy milk");
    }

    #[test]
    fn two_notes_append_two_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = NoteStore::new(dir.path().join("notes.txt"));

        store.append("buy milk").expect("first note");
        store.append("call mom").expect("second note");

        let contents = fs::read_to_string(store.path()).expect("read notes");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_note_line(lines[0], "buy milk");
        assert_note_line(lines[1], "call mom");
    }

    #[test]
    fn append_preserves_existing_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        fs::write(&path, "[2024-12-01T08:00:00.000000] old note\n").unwrap();

        let line = NoteStore::new(&path).append("new note").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("[2024-12-01T08:00:00.000000] old note\n"));
        assert!(contents.ends_with(&format!("{line}\n")));
    }

    #[test]
    fn append_reports_unwritable_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = NoteStore::new(dir.path().join("missing").join("notes.txt"));
        assert!(store.append("lost").is_err());
    }
}
