/*
 * @file normalize.rs
 * @brief Utterance normalization and wake-word stripping
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

//! Input normalization.
//!
//! Every raw line of input, spoken or typed, passes through [`normalize`] and
//! [`strip_wake_word`] before it reaches the command table.

/// Where an utterance came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    Voice,
    Typed,
}

/// One normalized unit of user input for a single dispatch cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    raw: String,
    normalized: String,
    source: InputSource,
}

impl Utterance {
    /// Builds an utterance by normalizing `raw` and removing the wake word.
    ///
    /// # Arguments
    /// * `raw` - Captured text, or `None` when acquisition produced nothing.
    /// * `source` - Voice or typed input.
    /// * `wake_word` - Token to strip; an empty token disables stripping.
    pub fn new(raw: Option<&str>, source: InputSource, wake_word: &str) -> Self {
        let normalized = strip_wake_word(&normalize(raw), wake_word);
        Self {
            raw: raw.unwrap_or_default().to_string(),
            normalized,
            source,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lowercased, trimmed text with the wake word removed.
    pub fn text(&self) -> &str {
        &self.normalized
    }

    pub fn source(&self) -> InputSource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Lowercases and trims raw input; absent input becomes the empty string.
pub fn normalize(raw: Option<&str>) -> String {
    raw.map(|text| text.trim().to_lowercase()).unwrap_or_default()
}

/// Removes the wake word from normalized text and trims the result.
///
/// # Details
/// The first occurrence is removed and the scan repeats, so text such as
/// `"jarvis, jarvis time"` or `"jarjarvisvis"` comes back free of the token.
/// Text without the token is returned unchanged.
///
/// # Arguments
/// * `text` - Normalized (lowercase) text.
/// * `wake_word` - Lowercase token to remove.
///
/// # Returns
/// * `String` - Text with no occurrence of `wake_word` and no outer whitespace.
pub fn strip_wake_word(text: &str, wake_word: &str) -> String {
    let wake_word = wake_word.trim();
    if wake_word.is_empty() || !text.contains(wake_word) {
        return text.to_string();
    }
    let mut stripped = text.to_string();
    while let Some(pos) = stripped.find(wake_word) {
        stripped.replace_range(pos..pos + wake_word.len(), "");
    }
    stripped
        .trim_matches(|c: char| c.is_whitespace() || c == ',')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize(Some("  What TIME is it?  ")), "what time is it?");
    }

    #[test]
    fn normalize_degenerate_input_is_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
        assert_eq!(normalize(Some(" \t\n ")), "");
    }

    #[test]
    fn strip_removes_leading_wake_word() {
        assert_eq!(strip_wake_word("jarvis what time is it", "jarvis"), "what time is it");
    }

    #[test]
    fn strip_removes_comma_after_wake_word() {
        assert_eq!(strip_wake_word("jarvis, open github", "jarvis"), "open github");
    }

    #[test]
    fn strip_passes_through_without_token() {
        assert_eq!(strip_wake_word("open github", "jarvis"), "open github");
    }

    #[test]
    fn strip_leaves_no_token_or_outer_whitespace() {
        let samples = [
            "jarvis",
            "  jarvis  ",
            "hey jarvis",
            "jarvis jarvis note milk",
            "tell jarvis to stop jarvis",
            "jarjarvisvis date",
        ];
        for sample in samples {
            let stripped = strip_wake_word(sample, "jarvis");
            assert!(!stripped.contains("jarvis"), "{sample:?} -> {stripped:?}");
            assert_eq!(stripped, stripped.trim(), "{sample:?} -> {stripped:?}");
        }
    }

    #[test]
    fn empty_wake_word_disables_stripping() {
        assert_eq!(strip_wake_word("jarvis time", ""), "jarvis time");
    }

    #[test]
    fn utterance_applies_both_stages() {
        let utterance = Utterance::new(Some("  JARVIS Play Music "), InputSource::Voice, "jarvis");
        assert_eq!(utterance.raw(), "  JARVIS Play Music ");
        assert_eq!(utterance.text(), "play music");
        assert_eq!(utterance.source(), InputSource::Voice);
    }

    #[test]
    fn wake_word_alone_is_empty_utterance() {
        let utterance = Utterance::new(Some("Jarvis"), InputSource::Typed, "jarvis");
        assert!(utterance.is_empty());
    }
}
