//! Line editing for the interactive prompt.
//!
//! rustyline blocks on the terminal, so the editor runs on its own thread and
//! the async shell talks to it over channels. Raw mode turns Ctrl-C at the
//! prompt into [`ReadLine::Interrupted`] instead of a signal.

use std::sync::mpsc;
use std::thread;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, EditMode, Editor};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::CliError;
use crate::shell::{LineReader, ReadLine};

enum Request {
    Read {
        prompt: String,
        reply: oneshot::Sender<Result<String, ReadlineError>>,
    },
    AddHistory(String),
}

/// Terminal line editor with history recall.
pub struct Readline {
    requests: mpsc::Sender<Request>,
}

impl Readline {
    /// Start the editor thread, seeding recall with `history` (oldest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned or the terminal
    /// cannot be set up.
    pub async fn start(history: Vec<String>) -> Result<Self, CliError> {
        let (requests, inbox) = mpsc::channel();
        let (ready_tx, ready) = oneshot::channel();
        thread::Builder::new()
            .name("flink-readline".into())
            .spawn(move || run_editor(history, &inbox, ready_tx))?;

        match ready.await {
            Ok(Ok(())) => Ok(Self { requests }),
            Ok(Err(err)) => Err(CliError::Readline(err)),
            Err(_) => Err(editor_stopped()),
        }
    }
}

impl LineReader for Readline {
    fn draws_prompt(&self) -> bool {
        true
    }

    async fn read_line(&mut self, prompt: &str) -> Result<ReadLine, CliError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Read {
                prompt: prompt.to_string(),
                reply,
            })
            .map_err(|_| editor_stopped())?;
        let result = response.await.map_err(|_| editor_stopped())?;
        into_read_line(result)
    }

    fn add_history(&mut self, entry: &str) {
        if self.requests.send(Request::AddHistory(entry.to_string())).is_err() {
            debug!("line editor gone, history entry dropped");
        }
    }
}

fn run_editor(
    history: Vec<String>,
    inbox: &mpsc::Receiver<Request>,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .auto_add_history(false)
        .build();
    let mut editor = match Editor::<(), DefaultHistory>::with_config(config) {
        Ok(editor) => editor,
        Err(err) => {
            let _ = ready.send(Err(err.to_string()));
            return;
        }
    };
    for entry in history {
        if let Err(err) = editor.add_history_entry(entry) {
            warn!(error = %err, "failed to seed history");
            break;
        }
    }
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Ok(request) = inbox.recv() {
        match request {
            Request::Read { prompt, reply } => {
                let _ = reply.send(editor.readline(&prompt));
            }
            Request::AddHistory(entry) => {
                if let Err(err) = editor.add_history_entry(entry) {
                    warn!(error = %err, "failed to add history entry");
                }
            }
        }
    }
    debug!("line editor stopped");
}

fn into_read_line(result: Result<String, ReadlineError>) -> Result<ReadLine, CliError> {
    match result {
        Ok(line) => Ok(ReadLine::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
        Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
        Err(err) => Err(CliError::Readline(err.to_string())),
    }
}

fn editor_stopped() -> CliError {
    CliError::Readline("line editor thread stopped".into())
}
