//! # flink-proto
//!
//! Wire types exchanged with the Flink SQL statement service.
//!
//! The service executes statements asynchronously: a client creates a
//! [`Statement`], polls it until its [`Phase`] leaves `PENDING`, then pages
//! through [`ResultPage`]s.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod results;
pub mod statement;
pub mod types;

pub use error::ProtoError;
pub use results::{ExceptionList, Operation, ResultData, ResultItem, ResultMetadata, ResultPage, StatementException};
pub use statement::{
    ColumnDetails, DataType, ResultSchema, RowFieldType, Statement, StatementSpec, StatementStatus,
    StatementTraits,
};
pub use types::Phase;
