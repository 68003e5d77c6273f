//! Scripted gateway and session helpers for store tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};

use flink_proto::{
    Phase, ResultPage, Statement, StatementException, StatementSpec, StatementStatus,
};
use flink_store::properties::KEY_LOCAL_TIME_ZONE;
use flink_store::{
    FlinkGateway, GatewayError, ManualClock, SessionContext, SessionProperties, StatementStore,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub const ORG: &str = "org-1";
pub const ENV: &str = "env-1";

/// Gateway that replays scripted responses and records every call.
///
/// `get_statement` pops responses in order and repeats the last one once a
/// single response is left.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    statements: VecDeque<Result<Statement, GatewayError>>,
    create_error: Option<GatewayError>,
    pages: VecDeque<Result<ResultPage, GatewayError>>,
    exceptions: Option<Result<Vec<StatementException>, GatewayError>>,
    update_error: Option<GatewayError>,
    delete_error: Option<GatewayError>,
    cancel_after_gets: Option<(usize, CancellationToken)>,

    created: Vec<Statement>,
    updated: Vec<Statement>,
    deleted: Vec<String>,
    page_tokens: Vec<String>,
    get_calls: usize,
    exception_calls: usize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = StatementStatus>) -> Self {
        {
            let mut state = self.state.lock();
            for status in statuses {
                state.statements.push_back(Ok(remote("stmt", "SELECT 1", status)));
            }
        }
        self
    }

    pub fn with_statement(self, statement: Result<Statement, GatewayError>) -> Self {
        self.state.lock().statements.push_back(statement);
        self
    }

    pub fn with_create_error(self, err: GatewayError) -> Self {
        self.state.lock().create_error = Some(err);
        self
    }

    pub fn with_page(self, page: Result<ResultPage, GatewayError>) -> Self {
        self.state.lock().pages.push_back(page);
        self
    }

    pub fn with_exceptions(self, exceptions: Result<Vec<StatementException>, GatewayError>) -> Self {
        self.state.lock().exceptions = Some(exceptions);
        self
    }

    pub fn with_update_error(self, err: GatewayError) -> Self {
        self.state.lock().update_error = Some(err);
        self
    }

    pub fn with_delete_error(self, err: GatewayError) -> Self {
        self.state.lock().delete_error = Some(err);
        self
    }

    /// Cancel `token` once `gets` status requests were answered.
    pub fn cancel_after_gets(self, gets: usize, token: CancellationToken) -> Self {
        self.state.lock().cancel_after_gets = Some((gets, token));
        self
    }

    pub fn created(&self) -> Vec<Statement> {
        self.state.lock().created.clone()
    }

    pub fn updated(&self) -> Vec<Statement> {
        self.state.lock().updated.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn page_tokens(&self) -> Vec<String> {
        self.state.lock().page_tokens.clone()
    }

    pub fn get_calls(&self) -> usize {
        self.state.lock().get_calls
    }

    pub fn exception_calls(&self) -> usize {
        self.state.lock().exception_calls
    }
}

impl FlinkGateway for FakeGateway {
    async fn create_statement(
        &self,
        statement: &Statement,
        environment_id: &str,
        organization_id: &str,
    ) -> Result<Statement, GatewayError> {
        let mut state = self.state.lock();
        state.created.push(statement.clone());
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        let mut created = statement.clone();
        created.environment_id = environment_id.to_string();
        created.organization_id = organization_id.to_string();
        created.status = Some(StatementStatus::new(Phase::Pending));
        Ok(created)
    }

    async fn get_statement(
        &self,
        _environment_id: &str,
        name: &str,
        _organization_id: &str,
    ) -> Result<Statement, GatewayError> {
        let mut state = self.state.lock();
        state.get_calls += 1;
        if let Some((after, token)) = &state.cancel_after_gets {
            if state.get_calls >= *after {
                token.cancel();
            }
        }
        let response = if state.statements.len() > 1 {
            state.statements.pop_front()
        } else {
            state.statements.front().cloned()
        };
        match response {
            Some(Ok(mut statement)) => {
                statement.name = name.to_string();
                Ok(statement)
            }
            Some(Err(err)) => Err(err),
            None => Err(GatewayError::new("statement not found").with_status_code(404)),
        }
    }

    async fn get_statement_results(
        &self,
        _environment_id: &str,
        _name: &str,
        _organization_id: &str,
        page_token: &str,
    ) -> Result<ResultPage, GatewayError> {
        let mut state = self.state.lock();
        state.page_tokens.push(page_token.to_string());
        state
            .pages
            .pop_front()
            .unwrap_or_else(|| Ok(ResultPage::new(Vec::new(), None)))
    }

    async fn update_statement(
        &self,
        _environment_id: &str,
        _name: &str,
        _organization_id: &str,
        statement: &Statement,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if let Some(err) = state.update_error.clone() {
            return Err(err);
        }
        state.updated.push(statement.clone());
        Ok(())
    }

    async fn delete_statement(
        &self,
        _environment_id: &str,
        name: &str,
        _organization_id: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        state.deleted.push(name.to_string());
        match state.delete_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn get_exceptions(
        &self,
        _environment_id: &str,
        _name: &str,
        _organization_id: &str,
    ) -> Result<Vec<StatementException>, GatewayError> {
        let mut state = self.state.lock();
        state.exception_calls += 1;
        state.exceptions.clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn remote(name: &str, sql: &str, status: StatementStatus) -> Statement {
    let mut statement = Statement::new(name, StatementSpec::new(sql));
    statement.status = Some(status);
    statement
}

pub fn pending() -> StatementStatus {
    StatementStatus::new(Phase::Pending)
}

pub fn pending_with(detail: &str) -> StatementStatus {
    StatementStatus::new(Phase::Pending).with_detail(detail)
}

pub fn phase(phase: Phase) -> StatementStatus {
    StatementStatus::new(phase)
}

/// Defaults as the shell builds them: catalog and database are plain
/// session values, never defaults.
pub fn default_properties() -> BTreeMap<String, String> {
    BTreeMap::from([(KEY_LOCAL_TIME_ZONE.to_string(), "GMT+00:00".to_string())])
}

pub fn context() -> SessionContext {
    SessionContext::new(ORG, ENV)
        .with_compute_pool("pool-1")
        .with_user_principal("u-123")
}

pub fn store(gateway: FakeGateway) -> (StatementStore<FakeGateway, ManualClock>, ManualClock) {
    store_with(gateway, default_properties(), BTreeMap::new())
}

pub fn store_with(
    gateway: FakeGateway,
    defaults: BTreeMap<String, String>,
    initial: BTreeMap<String, String>,
) -> (StatementStore<FakeGateway, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let store = StatementStore::with_clock(
        gateway,
        context(),
        SessionProperties::new(defaults, initial),
        clock.clone(),
    );
    (store, clock)
}
