//! Statement store: dispatches local commands and drives remote statements.
//!
//! Remote statements go through a fixed lifecycle. They are created once,
//! polled while `PENDING` with a stepped backoff, and then read page by page.
//! The store spawns nothing; every wait happens inside the caller's future
//! and is driven by the injected [`Clock`].

use std::time::Duration;

use chrono::Utc;
use flink_proto::{Phase, Statement, StatementSpec};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, TokioClock};
use crate::error::StatementError;
use crate::gateway::{FlinkGateway, SessionContext};
use crate::local::{process_reset, process_set, process_use};
use crate::parser::{parse_reset, parse_set, parse_use};
use crate::properties::{
    KEY_RESULTS_TIMEOUT, KEY_SERVICE_ACCOUNT, KEY_STATEMENT_NAME, SessionProperties,
};
use crate::results::{convert_results, extract_page_token};
use crate::router::{StatementType, classify};
use crate::statement::{ProcessedStatement, StatementOutcome};

/// First wait between two status polls.
pub const INITIAL_POLL_WAIT: Duration = Duration::from_millis(300);
/// Added to the poll wait every [`POLLS_PER_WAIT_STEP`] polls.
pub const POLL_WAIT_STEP: Duration = Duration::from_millis(300);
/// Number of polls between two wait increases.
pub const POLLS_PER_WAIT_STEP: usize = 10;
/// Pending details tolerated before giving up.
pub const MAX_CAPTURED_ERRORS: usize = 5;
/// Interval between two progress notifications.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);
/// Pending timeout when `client.results-timeout` is not set.
pub const DEFAULT_RESULTS_TIMEOUT: Duration = Duration::from_secs(600);
/// Poll interval while waiting for a terminal phase.
pub const TERMINAL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Progress of a pending statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    /// Statement being waited on.
    pub statement_name: String,
    /// Last observed phase.
    pub phase: Phase,
    /// Time waited so far.
    pub elapsed: Duration,
    /// Time after which the wait gives up.
    pub timeout: Duration,
}

/// Executes statements for one session.
///
/// Owns the session properties: local commands and submissions take
/// `&mut self`, everything that only reads remote state takes `&self`.
pub struct StatementStore<G, C = TokioClock> {
    gateway: G,
    clock: C,
    context: SessionContext,
    properties: SessionProperties,
    progress: Option<mpsc::UnboundedSender<PollProgress>>,
}

impl<G: FlinkGateway> StatementStore<G> {
    /// Create a store on the tokio clock.
    #[must_use]
    pub fn new(gateway: G, context: SessionContext, properties: SessionProperties) -> Self {
        Self::with_clock(gateway, context, properties, TokioClock)
    }
}

impl<G: FlinkGateway, C: Clock> StatementStore<G, C> {
    /// Create a store on a custom clock.
    #[must_use]
    pub fn with_clock(
        gateway: G,
        context: SessionContext,
        properties: SessionProperties,
        clock: C,
    ) -> Self {
        Self {
            gateway,
            clock,
            context,
            properties,
            progress: None,
        }
    }

    /// Send pending-wait progress to a channel.
    #[must_use]
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<PollProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Current session properties.
    #[must_use]
    pub fn properties(&self) -> &SessionProperties {
        &self.properties
    }

    /// Session identity and placement.
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Process one statement.
    ///
    /// Local commands complete immediately. Anything else is submitted and
    /// returned as soon as the service accepts it; use
    /// [`wait_for_pending_statement`](Self::wait_for_pending_statement) next.
    pub async fn process_statement(&mut self, statement: &str) -> Result<StatementOutcome, StatementError> {
        let processed = match classify(statement) {
            StatementType::Set => {
                let pair = parse_set(statement)?;
                process_set(&mut self.properties, statement, pair)?
            }
            StatementType::Use => {
                let target = parse_use(statement)?;
                process_use(&mut self.properties, statement, target)?
            }
            StatementType::Reset => {
                let key = parse_reset(statement)?;
                process_reset(&mut self.properties, statement, key)?
            }
            StatementType::Exit => return Ok(StatementOutcome::ExitRequested),
            StatementType::Other => self.submit_statement(statement).await?,
        };
        Ok(StatementOutcome::Processed(processed))
    }

    async fn submit_statement(&mut self, statement: &str) -> Result<ProcessedStatement, StatementError> {
        let name = self.take_statement_name();
        let mut spec = StatementSpec::new(statement).with_properties(self.properties.non_local_properties());
        if let Some(pool) = &self.context.compute_pool_id {
            spec = spec.with_compute_pool(pool.as_str());
        }
        if let Some(principal) = self.principal() {
            spec = spec.with_principal(principal);
        }

        let mut request = Statement::new(name.as_str(), spec);
        request.organization_id.clone_from(&self.context.organization_id);
        request.environment_id.clone_from(&self.context.environment_id);

        debug!(statement = %name, "submitting statement");
        let mut created = self
            .gateway
            .create_statement(&request, &self.context.environment_id, &self.context.organization_id)
            .await?;
        if created.name.is_empty() {
            created.name = name;
        }

        let detail = self.status_detail(&created.name, &created).await;
        debug!(statement = %created.name, phase = %created.phase(), "statement submitted");
        Ok(ProcessedStatement::from_remote(&created, detail))
    }

    /// Name for the next submission. A configured name is used only once.
    fn take_statement_name(&mut self) -> String {
        let configured = self
            .properties
            .get(KEY_STATEMENT_NAME)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);
        self.properties.delete(KEY_STATEMENT_NAME);
        configured.unwrap_or_else(generate_statement_name)
    }

    fn principal(&self) -> Option<String> {
        self.properties
            .get(KEY_SERVICE_ACCOUNT)
            .filter(|account| !account.is_empty())
            .map(ToString::to_string)
            .or_else(|| self.context.user_principal.clone())
    }

    /// How long a statement may stay pending.
    ///
    /// Read from `client.results-timeout` in milliseconds; a missing or
    /// unparsable value yields [`DEFAULT_RESULTS_TIMEOUT`].
    #[must_use]
    pub fn results_timeout(&self) -> Duration {
        self.properties
            .get(KEY_RESULTS_TIMEOUT)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map_or(DEFAULT_RESULTS_TIMEOUT, Duration::from_millis)
    }

    /// Poll a statement until it leaves `PENDING`.
    ///
    /// Gives up on a gateway error, after more than [`MAX_CAPTURED_ERRORS`]
    /// pending status details, or once [`results_timeout`](Self::results_timeout)
    /// has elapsed. Cancellation deletes the statement on the service.
    pub async fn wait_for_pending_statement(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessedStatement, StatementError> {
        let timeout = self.results_timeout();
        let start = self.clock.now();
        let mut wait = INITIAL_POLL_WAIT;
        let mut polls = 0usize;
        let mut captured: Vec<String> = Vec::new();
        let mut last_progress = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Err(self.abort_pending(name).await);
            }

            let request_start = self.clock.now();
            let statement = self
                .gateway
                .get_statement(&self.context.environment_id, name, &self.context.organization_id)
                .await?;
            let request_duration = self.clock.now().saturating_duration_since(request_start);

            let phase = statement.phase();
            if phase != Phase::Pending {
                let detail = self.status_detail(name, &statement).await;
                debug!(statement = %name, phase = %phase, "statement left pending");
                return Ok(ProcessedStatement::from_remote(&statement, detail));
            }

            let detail = statement.detail().trim();
            if !detail.is_empty() {
                debug!(statement = %name, detail, "statement pending with detail");
                captured.push(detail.to_string());
                if captured.len() > MAX_CAPTURED_ERRORS {
                    return Err(StatementError::RetryBudgetExceeded {
                        retries: captured.len(),
                        detail: captured.join("\n"),
                    });
                }
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= timeout {
                return Err(StatementError::Timeout {
                    timeout,
                    property: KEY_RESULTS_TIMEOUT,
                    detail: captured.join("\n"),
                });
            }
            if elapsed.saturating_sub(last_progress) >= PROGRESS_INTERVAL {
                last_progress = elapsed;
                self.report_progress(name, phase, elapsed, timeout);
            }

            polls += 1;
            if polls % POLLS_PER_WAIT_STEP == 0 {
                wait += POLL_WAIT_STEP;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.abort_pending(name).await),
                () = self.clock.sleep(wait.saturating_sub(request_duration)) => {}
            }
        }
    }

    fn report_progress(&self, name: &str, phase: Phase, elapsed: Duration, timeout: Duration) {
        info!(
            statement = %name,
            phase = %phase,
            elapsed_secs = elapsed.as_secs(),
            timeout_secs = timeout.as_secs(),
            "waiting for statement"
        );
        if let Some(progress) = &self.progress {
            let _ = progress.send(PollProgress {
                statement_name: name.to_string(),
                phase,
                elapsed,
                timeout,
            });
        }
    }

    async fn abort_pending(&self, name: &str) -> StatementError {
        info!(statement = %name, "result retrieval cancelled");
        self.delete_statement(name).await;
        StatementError::cancelled()
    }

    /// Status detail of a statement, backfilled from its exceptions when the
    /// service left it blank on a failure.
    async fn status_detail(&self, name: &str, statement: &Statement) -> String {
        let detail = statement.detail();
        if !detail.trim().is_empty() || !matches!(statement.phase(), Phase::Failed | Phase::Failing) {
            return detail.to_string();
        }

        match self
            .gateway
            .get_exceptions(&self.context.environment_id, name, &self.context.organization_id)
            .await
        {
            Ok(exceptions) => exceptions
                .into_iter()
                .next()
                .map(|exception| exception.message)
                .unwrap_or_default(),
            Err(err) => {
                debug!(statement = %name, error = %err, "failed to fetch statement exceptions");
                String::new()
            }
        }
    }

    /// Fetch the next page of results.
    ///
    /// Local statements are returned unchanged. For remote statements the
    /// page replaces the current rows and the page token moves forward.
    pub async fn fetch_statement_results(
        &self,
        mut statement: ProcessedStatement,
    ) -> Result<ProcessedStatement, StatementError> {
        if statement.is_local_statement() {
            return Ok(statement);
        }

        let page = self
            .gateway
            .get_statement_results(
                &self.context.environment_id,
                statement.name(),
                &self.context.organization_id,
                statement.page_token(),
            )
            .await?;

        let mut results = convert_results(&page.results.data, statement.result_schema())?;
        if results.headers.is_empty() {
            results.headers = std::mem::take(&mut statement.results.headers);
        }
        statement.results = results;
        statement.page_token = extract_page_token(page.next_link());
        debug!(
            statement = %statement.name(),
            rows = statement.results.len(),
            more = statement.has_more_pages(),
            "fetched result page"
        );
        Ok(statement)
    }

    /// Fetch pages until they run out, a page comes back empty, `cancel`
    /// fires or `max_pages` pages were read. Rows of all pages are
    /// concatenated.
    ///
    /// An empty page means a running query has nothing new yet; the page
    /// token is kept so the caller can resume later.
    pub async fn fetch_all_results(
        &self,
        statement: ProcessedStatement,
        cancel: &CancellationToken,
        max_pages: usize,
    ) -> Result<ProcessedStatement, StatementError> {
        if statement.is_local_statement() {
            return Ok(statement);
        }

        let mut current = statement;
        let mut rows = Vec::new();
        let mut pages = 0usize;
        while pages < max_pages && !cancel.is_cancelled() {
            current = self.fetch_statement_results(current).await?;
            pages += 1;
            if current.results.is_empty() {
                debug!(statement = %current.name(), pages, "result page empty, pausing fetch");
                break;
            }
            rows.append(&mut current.results.rows);
            if !current.has_more_pages() {
                break;
            }
        }
        current.results.rows = rows;
        Ok(current)
    }

    /// Ask the service to stop a statement. Failures are logged.
    pub async fn stop_statement(&self, name: &str) -> bool {
        let env = &self.context.environment_id;
        let org = &self.context.organization_id;

        let mut statement = match self.gateway.get_statement(env, name, org).await {
            Ok(statement) => statement,
            Err(err) => {
                warn!(statement = %name, error = %err, "failed to stop statement");
                return false;
            }
        };
        statement.spec.stopped = true;

        match self.gateway.update_statement(env, name, org, &statement).await {
            Ok(()) => {
                debug!(statement = %name, "statement stopped");
                true
            }
            Err(err) => {
                warn!(statement = %name, error = %err, "failed to stop statement");
                false
            }
        }
    }

    /// Delete a statement. Failures are logged.
    pub async fn delete_statement(&self, name: &str) -> bool {
        match self
            .gateway
            .delete_statement(&self.context.environment_id, name, &self.context.organization_id)
            .await
        {
            Ok(()) => {
                debug!(statement = %name, "statement deleted");
                true
            }
            Err(err) => {
                warn!(statement = %name, error = %err, "failed to delete statement");
                false
            }
        }
    }

    /// Poll every [`TERMINAL_POLL_INTERVAL`] until the statement reaches a
    /// terminal phase.
    ///
    /// On cancellation the statement keeps running on the service and the
    /// last observed state is returned.
    pub async fn wait_for_terminal_statement_state(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessedStatement, StatementError> {
        loop {
            let statement = self
                .gateway
                .get_statement(&self.context.environment_id, name, &self.context.organization_id)
                .await?;
            let detail = self.status_detail(name, &statement).await;
            if statement.phase().is_terminal() {
                return Ok(ProcessedStatement::from_remote(&statement, detail));
            }
            if cancel.is_cancelled() {
                info!(statement = %name, phase = %statement.phase(), "detached from statement");
                return Ok(ProcessedStatement::from_remote(&statement, detail));
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(statement = %name, phase = %statement.phase(), "detached from statement");
                    return Ok(ProcessedStatement::from_remote(&statement, detail));
                }
                () = self.clock.sleep(TERMINAL_POLL_INTERVAL) => {}
            }
        }
    }
}

/// Generate a statement name of the form `cli-<date>-<time>-<uuid>`.
#[must_use]
pub fn generate_statement_name() -> String {
    format!("cli-{}-{}", Utc::now().format("%Y-%m-%d-%H%M%S"), Uuid::new_v4())
}
