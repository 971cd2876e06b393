//! Rowhouse server library.
//!
//! HTTP server and ingestion engine for tabular files of unknown schema.
//!
//! # Overview
//!
//! Rowhouse accepts delimited text files and spreadsheet workbooks, detects
//! their schema automatically, and persists every row as a JSON record
//! addressable by the originating import job:
//!
//! - **Parsing**: pluggable per-format parsers behind [`parser::TabularFileParser`],
//!   resolved by file extension, with automatic column type inference
//! - **Ingestion engine**: a bounded job queue feeding a worker pool
//!   (at most three concurrently executing imports), each import running a
//!   backpressured producer/consumer pipeline into batched bulk writes
//! - **Persistence**: job/schema/record repositories with a transactional
//!   PostgreSQL backing and an in-memory document backing behind the same
//!   traits; the engine never knows which is live
//! - **HTTP surface**: axum feature routers for submitting files (sync or
//!   async), polling progress, and querying imported rows
//!
//! # Job lifecycle
//!
//! ```text
//! Pending -> Processing -> Completed | CompletedWithErrors | Failed
//! ```
//!
//! Per-row parse failures are counted, never fatal; parser resolution,
//! schema detection, and persistence errors terminate the job as `Failed`
//! with the error message on the job row.
//!
//! # Example
//!
//! ```no_run
//! use rowhouse_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     rowhouse_server::serve(config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod repo;
mod server;

pub use error::{AppError, AppResult};
pub use server::serve;
