/*
 * @file commands.rs
 * @brief Ordered intent rules and argument extraction
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

//! Command rule table.
//!
//! Intents are recognised by plain substring and prefix tests evaluated in a
//! fixed priority order. The first rule whose predicate holds decides the
//! intent, even when a later rule would also match: "exit at this time" is an
//! exit, and "shutdown assistant" never reaches the computer-shutdown rule.

use std::collections::BTreeMap;

/// Phrases that end the session.
const EXIT_KEYWORDS: [&str; 4] = ["exit", "quit", "goodbye", "shutdown assistant"];

/// Phrases that trigger and are then removed from a knowledge lookup.
const LOOKUP_TRIGGERS: [&str; 3] = ["wikipedia", "who is", "what is"];

const OPEN_PREFIX: &str = "open ";

const SEARCH_PREFIXES: [&str; 2] = ["search ", "google "];

const NOTE_KEYWORDS: [&str; 2] = ["note", "remember"];

/// An intent recognised from a normalized utterance, with its argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Nothing was said after normalization.
    Empty,
    Exit,
    Time,
    Date,
    /// Knowledge lookup; `query` may be empty and then needs clarification.
    Lookup { query: String },
    Open { target: String },
    Search { query: String },
    /// Media playback of an optional local path.
    Play { target: Option<String> },
    ShutdownComputer,
    /// Note body; may be empty and then needs clarification.
    Note { text: String },
    /// No rule matched; handled by the conversational or generic fallback.
    Unmatched { text: String },
}

/// Identifies a rule in [`RULES`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    Empty,
    Exit,
    Time,
    Date,
    Lookup,
    Open,
    Search,
    Play,
    ShutdownComputer,
    Note,
}

/// A predicate bound to an argument extractor, ranked by priority.
///
/// # Details
/// Lower `priority` values are evaluated first. Rules are defined once in
/// [`RULES`] and never change at runtime.
pub struct CommandRule {
    pub kind: RuleKind,
    pub priority: u8,
    predicate: fn(&str) -> bool,
    extract: fn(&str) -> Intent,
}

impl CommandRule {
    /// Whether the rule applies to `text`.
    pub fn matches(&self, text: &str) -> bool {
        (self.predicate)(text)
    }

    /// Builds the intent, extracting the rule's argument from `text`.
    pub fn extract(&self, text: &str) -> Intent {
        (self.extract)(text)
    }
}

impl std::fmt::Debug for CommandRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRule")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Every command rule, highest priority first.
pub static RULES: [CommandRule; 10] = [
    CommandRule {
        kind: RuleKind::Empty,
        priority: 0,
        predicate: str::is_empty,
        extract: |_| Intent::Empty,
    },
    CommandRule {
        kind: RuleKind::Exit,
        priority: 1,
        predicate: |text| contains_any(text, &EXIT_KEYWORDS),
        extract: |_| Intent::Exit,
    },
    CommandRule {
        kind: RuleKind::Time,
        priority: 2,
        predicate: |text| text.contains("time"),
        extract: |_| Intent::Time,
    },
    CommandRule {
        kind: RuleKind::Date,
        priority: 3,
        predicate: |text| text.contains("date"),
        extract: |_| Intent::Date,
    },
    CommandRule {
        kind: RuleKind::Lookup,
        priority: 4,
        predicate: is_lookup,
        extract: |text| Intent::Lookup {
            query: remove_all(text, &LOOKUP_TRIGGERS),
        },
    },
    CommandRule {
        kind: RuleKind::Open,
        priority: 5,
        predicate: |text| text.starts_with(OPEN_PREFIX),
        extract: |text| Intent::Open {
            target: text
                .strip_prefix(OPEN_PREFIX)
                .unwrap_or(text)
                .trim()
                .to_string(),
        },
    },
    CommandRule {
        kind: RuleKind::Search,
        priority: 6,
        predicate: |text| SEARCH_PREFIXES.iter().any(|p| text.starts_with(p)),
        extract: |text| Intent::Search {
            query: strip_first_prefix(text, &SEARCH_PREFIXES),
        },
    },
    CommandRule {
        kind: RuleKind::Play,
        priority: 7,
        predicate: |text| text.contains("play music") || text.starts_with("play "),
        extract: |text| {
            let target = remove_all(text, &["play music", "play"]);
            Intent::Play {
                target: (!target.is_empty()).then_some(target),
            }
        },
    },
    CommandRule {
        kind: RuleKind::ShutdownComputer,
        priority: 8,
        predicate: |text| text.contains("shutdown") && text.contains("computer"),
        extract: |_| Intent::ShutdownComputer,
    },
    CommandRule {
        kind: RuleKind::Note,
        priority: 9,
        predicate: |text| contains_any(text, &NOTE_KEYWORDS),
        extract: |text| Intent::Note {
            text: remove_all(text, &NOTE_KEYWORDS),
        },
    },
];

/// Finds the first rule, in priority order, that matches `text`.
///
/// # Arguments
/// * `text` - The normalized, wake-word-free utterance.
///
/// # Returns
/// * `Some(&CommandRule)` - The highest-priority matching rule.
/// * `None` - Only the fallbacks apply.
pub fn find_rule(text: &str) -> Option<&'static CommandRule> {
    RULES.iter().find(|rule| rule.matches(text))
}

/// Classifies normalized text into an [`Intent`].
pub fn classify(text: &str) -> Intent {
    match find_rule(text) {
        Some(rule) => rule.extract(text),
        None => Intent::Unmatched {
            text: text.to_string(),
        },
    }
}

/// Where an "open" command points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenTarget {
    /// An address to hand to the browser.
    Url(String),
    /// A named site from the configured map.
    Site { name: String, url: String },
    /// Neither an address nor a known name.
    Unrecognized(String),
}

/// Resolves the argument of an "open" command.
///
/// # Details
/// Targets carrying a scheme (`://`) are used as-is; dotted targets get an
/// `https://` prefix; anything else is looked up in `sites`.
pub fn resolve_open_target(target: &str, sites: &BTreeMap<String, String>) -> OpenTarget {
    if target.contains("://") {
        OpenTarget::Url(target.to_string())
    } else if target.contains('.') {
        OpenTarget::Url(format!("https://{}", target))
    } else if let Some(url) = sites.get(target) {
        OpenTarget::Site {
            name: target.to_string(),
            url: url.clone(),
        }
    } else {
        OpenTarget::Unrecognized(target.to_string())
    }
}

/// Builds a Google search URL with spaces folded into `+`.
pub fn search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", query.replace(' ', "+"))
}

fn is_lookup(text: &str) -> bool {
    text.starts_with(LOOKUP_TRIGGERS[0])
        || text.contains(LOOKUP_TRIGGERS[1])
        || text.contains(LOOKUP_TRIGGERS[2])
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Removes every occurrence of each phrase, in order, and trims.
fn remove_all(text: &str, phrases: &[&str]) -> String {
    phrases
        .iter()
        .fold(text.to_string(), |acc, phrase| acc.replace(phrase, ""))
        .trim()
        .to_string()
}

fn strip_first_prefix(text: &str, prefixes: &[&str]) -> String {
    prefixes
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .unwrap_or(text)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(text: &str) -> Option<RuleKind> {
        find_rule(text).map(|rule| rule.kind)
    }

    fn sites() -> BTreeMap<String, String> {
        BTreeMap::from([("youtube".to_string(), "https://youtube.com".to_string())])
    }

    #[test]
    fn rules_are_in_strict_priority_order() {
        for pair in RULES.windows(2) {
            assert!(pair[0].priority < pair[1].priority, "{:?}", pair);
        }
    }

    #[test]
    fn empty_text_is_empty_intent() {
        assert_eq!(classify(""), Intent::Empty);
    }

    #[test]
    fn exit_beats_time() {
        assert_eq!(classify("exit, what time is it"), Intent::Exit);
        assert_eq!(classify("is it time to quit"), Intent::Exit);
    }

    #[test]
    fn shutdown_assistant_is_exit() {
        assert_eq!(kind_of("shutdown assistant"), Some(RuleKind::Exit));
        assert_eq!(kind_of("shutdown assistant computer"), Some(RuleKind::Exit));
    }

    #[test]
    fn computer_shutdown_needs_both_words() {
        assert_eq!(
            kind_of("please shutdown this computer"),
            Some(RuleKind::ShutdownComputer)
        );
        assert_eq!(kind_of("shutdown"), None);
        assert_eq!(kind_of("my computer is slow"), None);
    }

    #[test]
    fn time_precedes_date() {
        assert_eq!(classify("what is the date and time"), Intent::Time);
        assert_eq!(classify("todays date"), Intent::Date);
    }

    #[test]
    fn lookup_strips_all_triggers() {
        assert_eq!(
            classify("wikipedia who is ada lovelace"),
            Intent::Lookup {
                query: "ada lovelace".to_string()
            }
        );
        assert_eq!(
            classify("tell me what is rust"),
            Intent::Lookup {
                query: "tell me  rust".to_string()
            }
        );
    }

    #[test]
    fn lookup_with_only_trigger_has_empty_query() {
        assert_eq!(
            classify("wikipedia"),
            Intent::Lookup {
                query: String::new()
            }
        );
    }

    #[test]
    fn open_strips_prefix() {
        assert_eq!(
            classify("open example.com"),
            Intent::Open {
                target: "example.com".to_string()
            }
        );
    }

    #[test]
    fn search_strips_only_the_prefix() {
        assert_eq!(
            classify("google search engines"),
            Intent::Search {
                query: "search engines".to_string()
            }
        );
        assert_eq!(search_url("rust async book"), "https://www.google.com/search?q=rust+async+book");
    }

    #[test]
    fn play_extracts_optional_target() {
        assert_eq!(classify("play music"), Intent::Play { target: None });
        assert_eq!(
            classify("play /tmp/song.mp3"),
            Intent::Play {
                target: Some("/tmp/song.mp3".to_string())
            }
        );
        assert_eq!(kind_of("display settings"), None);
    }

    #[test]
    fn note_strips_keywords() {
        assert_eq!(
            classify("remember to buy milk"),
            Intent::Note {
                text: "to buy milk".to_string()
            }
        );
        assert_eq!(classify("note"), Intent::Note { text: String::new() });
    }

    #[test]
    fn unmatched_text_is_kept() {
        assert_eq!(
            classify("tell me a joke"),
            Intent::Unmatched {
                text: "tell me a joke".to_string()
            }
        );
    }

    #[test]
    fn open_target_resolution() {
        assert_eq!(
            resolve_open_target("example.com", &sites()),
            OpenTarget::Url("https://example.com".to_string())
        );
        assert_eq!(
            resolve_open_target("http://x.com", &sites()),
            OpenTarget::Url("http://x.com".to_string())
        );
        assert_eq!(
            resolve_open_target("youtube", &sites()),
            OpenTarget::Site {
                name: "youtube".to_string(),
                url: "https://youtube.com".to_string()
            }
        );
        assert_eq!(
            resolve_open_target("spotify", &sites()),
            OpenTarget::Unrecognized("spotify".to_string())
        );
    }
}
