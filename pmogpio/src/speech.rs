//! Spoken status announcements.
//!
//! Announcements are fire-and-forget: the caller never waits for the speech
//! synthesizer and never sees its failures.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::Deserialize;
use tracing::{debug, warn};

pub trait Announcer: Send + Sync {
    fn speak(&self, text: &str);
}

fn default_true() -> bool {
    true
}

fn default_command() -> String {
    "festival".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--tts".to_string()]
}

/// `speech:` section of the configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_command(),
            args: default_args(),
        }
    }
}

impl SpeechConfig {
    pub fn announcer(&self) -> Arc<dyn Announcer> {
        if self.enabled {
            Arc::new(CommandAnnouncer::new(&self.command, &self.args))
        } else {
            Arc::new(SilentAnnouncer)
        }
    }
}

/// Pipes the text to an external text-to-speech command (festival by default).
#[derive(Clone, Debug)]
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }
}

impl Announcer for CommandAnnouncer {
    fn speak(&self, text: &str) {
        let program = self.program.clone();
        let args = self.args.clone();
        let text = text.to_string();

        let spawned = thread::Builder::new()
            .name("announcer".to_string())
            .spawn(move || {
                if let Err(e) = run_command(&program, &args, &text) {
                    warn!(program = %program, error = %e, "Announcement failed");
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Cannot spawn announcer thread");
        }
    }
}

fn run_command(program: &str, args: &[String], text: &str) -> std::io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    // stdin must be closed before waiting, the synthesizer reads until EOF.
    let written = match child.stdin.take() {
        Some(mut stdin) => writeln!(stdin, "{}", text),
        None => Ok(()),
    };
    child.wait()?;
    written
}

/// Drops every announcement.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn speak(&self, text: &str) {
        debug!(text, "Announcement muted");
    }
}

/// Keeps announcements in memory instead of speaking them.
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    phrases: Mutex<Vec<String>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phrases(&self) -> Vec<String> {
        self.phrases
            .lock()
            .expect("RecordingAnnouncer mutex poisoned")
            .clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn speak(&self, text: &str) {
        self.phrases
            .lock()
            .expect("RecordingAnnouncer mutex poisoned")
            .push(text.to_string());
    }
}
