//! # flink-store
//!
//! Statement execution engine for an interactive Flink SQL client.
//!
//! Every input statement is classified once. `SET`, `USE` and `RESET` are
//! applied to the session properties without contacting the service;
//! `EXIT`/`QUIT` come back as [`StatementOutcome::ExitRequested`]; anything
//! else is submitted through a [`FlinkGateway`] and tracked by phase.
//!
//! ```text
//!               ┌──────────┐  SET/USE/RESET  ┌───────────────────┐
//!  statement ──►│  router  │────────────────►│ session properties│
//!               └────┬─────┘                 └───────────────────┘
//!                    │ other
//!                    ▼
//!          ┌───────────────────┐   create/poll/results   ┌─────────┐
//!          │  StatementStore   │◄───────────────────────►│ gateway │
//!          └───────────────────┘                         └─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod gateway;
pub mod local;
pub mod parser;
pub mod properties;
pub mod results;
pub mod router;
pub mod statement;
pub mod store;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{CANCELLED_STATUS_CODE, StatementError};
pub use gateway::{FlinkGateway, GatewayError, SessionContext};
pub use parser::UseTarget;
pub use properties::SessionProperties;
pub use router::{StatementType, classify};
pub use statement::{
    Field, ProcessedStatement, ResultRow, StatementKind, StatementOutcome, StatementResults,
};
pub use store::{PollProgress, StatementStore, generate_statement_name};
