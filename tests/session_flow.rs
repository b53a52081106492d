//! Drives a whole typed session against scripted input and recording fakes.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jarvis::assistant::{Console, Session, GOODBYE};
use jarvis::capture::UnavailableCapture;
use jarvis::config::AppConfig;
use jarvis::dispatcher::{Dispatcher, FAREWELL};
use jarvis::knowledge::WikipediaClient;
use jarvis::platform::Launcher;
use jarvis::speech::{SpeechOutput, Synthesizer};
use serde_json::json;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Log = Arc<Mutex<Vec<String>>>;

struct ScriptedConsole {
    input: VecDeque<String>,
    printed: Log,
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, _prompt: &str) -> std::io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn print(&mut self, line: &str) {
        self.printed.lock().unwrap().push(line.to_string());
    }
}

#[derive(Clone, Default)]
struct RecordingVoice(Log);

impl Synthesizer for RecordingVoice {
    fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingLauncher(Log);

impl Launcher for RecordingLauncher {
    fn open_url(&self, url: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn open_path(&self, path: &Path) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(path.display().to_string());
        Ok(())
    }

    fn shutdown(&self, _delay: Duration) -> anyhow::Result<()> {
        panic!("a test session must never power off the machine");
    }
}

async fn wikipedia() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("list", "search"))
        .and(query_param("srsearch", "ada lovelace"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "search": [ { "title": "Ada Lovelace" } ] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("prop", "extracts"))
        .and(query_param("titles", "Ada Lovelace"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": { "1": {
                "title": "Ada Lovelace",
                "extract": "Ada Lovelace was an English mathematician."
            } } }
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn typed_session_runs_until_exit() {
    let server = wikipedia().await;
    let dir = tempfile::tempdir().unwrap();
    let notes_path = dir.path().join("notes.txt");
    let config = AppConfig {
        notes_path: notes_path.clone(),
        wikipedia_api_url: server.uri(),
        ..AppConfig::default()
    };

    let spoken = RecordingVoice::default();
    let output = SpeechOutput::start(spoken.clone()).unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let dispatcher = Dispatcher::new(
        &config,
        output.speaker(),
        Arc::new(WikipediaClient::new(config.wikipedia_api_url.clone()).unwrap()),
        None,
        launcher.clone(),
    );

    let script = [
        "2", "Jarvis open GitHub",
        "2", "jarvis who is Ada Lovelace",
        "2", "remember to call mom",
        "2", "sing me a song",
        "2", "goodbye jarvis",
        "2", "what time is it",
    ];
    let printed = Log::default();
    let console = ScriptedConsole {
        input: script.iter().map(|line| line.to_string()).collect(),
        printed: printed.clone(),
    };
    let mut session = Session::new(
        console,
        dispatcher,
        output.speaker(),
        Box::new(UnavailableCapture),
        config.wake_word.as_str(),
    );
    session.welcome();
    session.run().await;
    drop(session);
    output.shutdown();

    let printed = printed.lock().unwrap().clone();
    let results: Vec<&str> = printed
        .iter()
        .filter_map(|line| line.strip_prefix("Result: "))
        .collect();
    assert_eq!(
        results,
        vec![
            "Opened github",
            "Ada Lovelace was an English mathematician.",
            "Noted: to call mom",
            "I didn't understand that. Try asking something else.",
            "Exiting...",
        ]
    );
    assert!(printed.contains(&"Processing: who is ada lovelace".to_string()));

    let spoken = spoken.0.lock().unwrap().clone();
    assert_eq!(spoken.first().map(String::as_str), Some(jarvis::assistant::WELCOME));
    assert_eq!(spoken.last().map(String::as_str), Some(FAREWELL));
    assert!(spoken.contains(&"Searching Wikipedia for ada lovelace".to_string()));
    assert!(!spoken.contains(&GOODBYE.to_string()));

    assert_eq!(*launcher.0.lock().unwrap(), vec!["https://github.com"]);
    let notes = std::fs::read_to_string(&notes_path).unwrap();
    assert_eq!(notes.lines().count(), 1);
    assert!(notes.trim_end().ends_with("] to call mom"));
}

#[tokio::test]
async fn speak_choice_without_microphone_falls_back_to_advisory() {
    let config = AppConfig::default();
    let spoken = RecordingVoice::default();
    let output = SpeechOutput::start(spoken.clone()).unwrap();
    let dispatcher = Dispatcher::new(
        &config,
        output.speaker(),
        Arc::new(WikipediaClient::new("http://127.0.0.1:9").unwrap()),
        None,
        Arc::new(RecordingLauncher::default()),
    );
    let printed = Log::default();
    let console = ScriptedConsole {
        input: ["1", "n", "3"].iter().map(|line| line.to_string()).collect(),
        printed: printed.clone(),
    };
    let mut session = Session::new(
        console,
        dispatcher,
        output.speaker(),
        Box::new(UnavailableCapture),
        "jarvis",
    );
    session.run().await;
    drop(session);
    output.shutdown();

    let printed = printed.lock().unwrap().clone();
    assert!(printed.contains(&"No microphone was automatically detected.".to_string()));
    assert!(printed.contains(&"No speech detected. Try typing instead.".to_string()));
    assert!(!printed.iter().any(|line| line.starts_with("Processing:")));
    assert_eq!(printed.last().map(String::as_str), Some("Goodbye."));
    assert_eq!(*spoken.0.lock().unwrap(), vec![GOODBYE]);
}
