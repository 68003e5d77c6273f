//! Statement loop.
//!
//! Input is buffered until an unquoted `;` completes a statement. Each
//! statement goes through the store: local commands print at once, remote
//! ones are waited on and their results paged in. Ctrl-C cancels the wait of
//! the statement in flight, not the shell; at the prompt it drops the
//! statement being typed.

use std::io::Write;

use flink_store::{
    FlinkGateway, ProcessedStatement, StatementError, StatementOutcome, StatementStore,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CliError;
use crate::history::History;
use crate::output::{ErrorReport, OutputFormat};

const PROMPT: &str = "flink> ";
const CONTINUATION_PROMPT: &str = "    -> ";

/// One read from a line source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A line without its terminator.
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// End of input.
    Eof,
}

/// Source of interactive input.
pub trait LineReader {
    /// Whether the reader shows the prompt itself.
    fn draws_prompt(&self) -> bool {
        false
    }

    /// Read the next line after `prompt`.
    fn read_line(&mut self, prompt: &str) -> impl Future<Output = Result<ReadLine, CliError>>;

    /// Offer an executed statement for recall.
    fn add_history(&mut self, _entry: &str) {}
}

/// Plain line source over an async reader. The shell writes the prompt.
pub struct AsyncLines<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> AsyncLines<R> {
    /// Wrap a reader.
    pub fn new(input: R) -> Self {
        Self { lines: input.lines() }
    }
}

impl<R: AsyncBufRead + Unpin> LineReader for AsyncLines<R> {
    async fn read_line(&mut self, _prompt: &str) -> Result<ReadLine, CliError> {
        Ok(match self.lines.next_line().await? {
            Some(line) => ReadLine::Line(line),
            None => ReadLine::Eof,
        })
    }
}

/// Result of running one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The statement succeeded.
    Continue,
    /// The statement failed; the error was printed.
    Failed,
    /// `EXIT` or `QUIT`.
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexer {
    Code,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
}

/// Incremental splitter of SQL text into statements.
///
/// Quotes, backticks and comments are tracked across lines, so a `;` inside
/// them never ends a statement.
#[derive(Debug, Clone)]
pub struct StatementSplitter {
    buffer: String,
    state: Lexer,
}

impl Default for StatementSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementSplitter {
    /// Create an empty splitter.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: Lexer::Code,
        }
    }

    /// Whether a statement is partially buffered.
    pub fn is_pending(&self) -> bool {
        !is_blank(&self.buffer)
    }

    /// Feed one line and return the statements it completes.
    pub fn push_line(&mut self, line: &str) -> Vec<String> {
        let mut complete = Vec::new();
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            let next = chars.peek().copied();
            match self.state {
                Lexer::Code => match c {
                    ';' => {
                        let statement = std::mem::take(&mut self.buffer);
                        if !is_blank(&statement) {
                            complete.push(statement.trim().to_string());
                        }
                        continue;
                    }
                    '\'' => self.state = Lexer::SingleQuote,
                    '"' => self.state = Lexer::DoubleQuote,
                    '`' => self.state = Lexer::Backtick,
                    '-' if next == Some('-') => self.state = Lexer::LineComment,
                    '/' if next == Some('*') => {
                        self.buffer.push(c);
                        self.buffer.push('*');
                        chars.next();
                        self.state = Lexer::BlockComment;
                        continue;
                    }
                    _ => {}
                },
                Lexer::SingleQuote if c == '\'' => self.state = Lexer::Code,
                Lexer::DoubleQuote if c == '"' => self.state = Lexer::Code,
                Lexer::Backtick if c == '`' => self.state = Lexer::Code,
                Lexer::BlockComment if c == '*' && next == Some('/') => {
                    self.buffer.push(c);
                    self.buffer.push('/');
                    chars.next();
                    self.state = Lexer::Code;
                    continue;
                }
                _ => {}
            }
            self.buffer.push(c);
        }

        if self.state == Lexer::LineComment {
            self.state = Lexer::Code;
        }
        self.buffer.push('\n');
        complete
    }

    /// Drop the buffered text.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = Lexer::Code;
    }

    /// Take whatever is buffered as a final, unterminated statement.
    pub fn finish(&mut self) -> Option<String> {
        self.state = Lexer::Code;
        let rest = std::mem::take(&mut self.buffer);
        (!is_blank(&rest)).then(|| rest.trim().to_string())
    }
}

/// Split a whole script into statements.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut splitter = StatementSplitter::new();
    let mut statements: Vec<String> = script.lines().flat_map(|line| splitter.push_line(line)).collect();
    statements.extend(splitter.finish());
    statements
}

/// Whether text holds nothing but whitespace and comments.
fn is_blank(text: &str) -> bool {
    flink_store::router::strip_leading_noise(text).is_empty()
}

/// Interactive or scripted statement loop over a store.
pub struct Shell<G: FlinkGateway> {
    store: StatementStore<G>,
    format: OutputFormat,
    history: Option<History>,
    last_recorded: Option<String>,
    max_pages: usize,
    wait_for_completion: bool,
    handle_interrupts: bool,
}

impl<G: FlinkGateway> Shell<G> {
    /// Create a shell.
    pub fn new(store: StatementStore<G>, format: OutputFormat) -> Self {
        Self {
            store,
            format,
            history: None,
            last_recorded: None,
            max_pages: 100,
            wait_for_completion: false,
            handle_interrupts: false,
        }
    }

    /// Record non-sensitive statements in a history file.
    #[must_use]
    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    /// Cap the result pages read per query.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Wait for non-query statements to reach a terminal phase.
    #[must_use]
    pub fn with_wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    /// Cancel the statement in flight on Ctrl-C.
    #[must_use]
    pub fn with_interrupts(mut self, enabled: bool) -> Self {
        self.handle_interrupts = enabled;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &StatementStore<G> {
        &self.store
    }

    /// Entries of the history file, oldest first.
    ///
    /// An unreadable file is logged and treated as empty.
    pub fn history_entries(&self) -> Vec<String> {
        let Some(history) = &self.history else {
            return Vec::new();
        };
        history.load().unwrap_or_else(|err| {
            warn!(error = %err, path = %history.path().display(), "failed to load history");
            Vec::new()
        })
    }

    /// Run every statement of a script, stopping at `EXIT`.
    ///
    /// Returns whether all statements succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    pub async fn run_script<W: Write>(&mut self, script: &str, out: &mut W) -> Result<bool, CliError> {
        let mut succeeded = true;
        for statement in split_statements(script) {
            match self.execute(&statement, out).await? {
                Step::Continue => {}
                Step::Failed => succeeded = false,
                Step::Exit => break,
            }
        }
        Ok(succeeded)
    }

    /// Read statements from `input` until end of input or `EXIT`.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read or output cannot be written.
    pub async fn run_interactive<R, W>(&mut self, input: R, out: &mut W) -> Result<(), CliError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.run_prompt(&mut AsyncLines::new(input), out).await
    }

    /// Prompt loop over any line source.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read or output cannot be written.
    pub async fn run_prompt<L, W>(&mut self, reader: &mut L, out: &mut W) -> Result<(), CliError>
    where
        L: LineReader,
        W: Write,
    {
        let mut splitter = StatementSplitter::new();

        loop {
            let prompt = if splitter.is_pending() { CONTINUATION_PROMPT } else { PROMPT };
            if !reader.draws_prompt() {
                write!(out, "{prompt}")?;
                out.flush()?;
            }

            match reader.read_line(prompt).await? {
                ReadLine::Line(line) => {
                    for statement in splitter.push_line(&line) {
                        let step = self.execute(&statement, out).await?;
                        if let Some(entry) = self.last_recorded.take() {
                            reader.add_history(&entry);
                        }
                        if step == Step::Exit {
                            return Ok(());
                        }
                    }
                }
                ReadLine::Interrupted if splitter.is_pending() => {
                    splitter.clear();
                    writeln!(out, "Statement discarded.")?;
                }
                ReadLine::Interrupted => writeln!(out, "Type EXIT or QUIT to leave the shell.")?,
                ReadLine::Eof => {
                    if !reader.draws_prompt() {
                        writeln!(out)?;
                    }
                    break;
                }
            }
        }

        if let Some(statement) = splitter.finish() {
            self.execute(&statement, out).await?;
        }
        Ok(())
    }

    /// Run one statement and print its outcome.
    ///
    /// Statement errors are printed, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    pub async fn execute<W: Write>(&mut self, statement: &str, out: &mut W) -> Result<Step, CliError> {
        let cancel = CancellationToken::new();
        let watcher = self.handle_interrupts.then(|| {
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            })
        });

        let result = self.execute_with(statement, &cancel, out).await;
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        result
    }

    /// Run one statement under a caller-owned cancellation token.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    pub async fn execute_with<W: Write>(
        &mut self,
        statement: &str,
        cancel: &CancellationToken,
        out: &mut W,
    ) -> Result<Step, CliError> {
        let processed = match self.store.process_statement(statement).await {
            Ok(StatementOutcome::ExitRequested) => return Ok(Step::Exit),
            Ok(StatementOutcome::Processed(processed)) => processed,
            Err(err) => return self.report(&err, out),
        };
        self.record(statement, &processed);

        if processed.is_local_statement() {
            self.format.write(out, &processed)?;
            return Ok(Step::Continue);
        }

        match self.follow(processed, cancel).await {
            Ok(done) => {
                self.format.write(out, &done)?;
                if done.status().is_failure() {
                    Ok(Step::Failed)
                } else {
                    Ok(Step::Continue)
                }
            }
            Err(err) => self.report(&err, out),
        }
    }

    /// Wait for a submitted statement and read its results.
    async fn follow(
        &self,
        submitted: ProcessedStatement,
        cancel: &CancellationToken,
    ) -> Result<ProcessedStatement, StatementError> {
        let statement = self.store.wait_for_pending_statement(submitted.name(), cancel).await?;
        if statement.status().is_failure() {
            return Ok(statement);
        }

        let statement = if self.wait_for_completion && !statement.is_select_statement() && !statement.is_terminal() {
            self.store
                .wait_for_terminal_statement_state(statement.name(), cancel)
                .await?
        } else {
            statement
        };

        if statement.result_schema().is_none() || statement.status().is_failure() {
            return Ok(statement);
        }
        self.store
            .fetch_all_results(statement, cancel, self.max_pages)
            .await
    }

    fn record(&mut self, statement: &str, processed: &ProcessedStatement) {
        if processed.is_sensitive_statement() {
            debug!("sensitive statement kept out of history");
            return;
        }
        self.last_recorded = Some(History::entry(statement));
        if let Some(history) = &self.history {
            if let Err(err) = history.append(statement) {
                warn!(error = %err, "failed to record history");
            }
        }
    }

    fn report<W: Write>(&self, err: &StatementError, out: &mut W) -> Result<Step, CliError> {
        self.format.write(out, &ErrorReport::from(err))?;
        Ok(Step::Failed)
    }
}
