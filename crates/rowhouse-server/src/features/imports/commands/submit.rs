//! Submit import command
//!
//! Accepts file bytes plus parser options and hands them to the ingestion
//! engine, either fire-and-forget (async) or waiting for the terminal job
//! state (sync).

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::super::queries::ImportJobDetails;
use crate::error::AppError;
use crate::ingest::{ImportSubmission, SubmitParams};
use crate::models::ParserOptions;

/// How the caller wants to wait for the import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    /// Return immediately with the `Pending` job; poll progress afterwards
    #[default]
    Async,
    /// Return only after the engine reaches a terminal state
    Sync,
}

impl std::str::FromStr for SubmitMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "async" => Ok(SubmitMode::Async),
            "sync" => Ok(SubmitMode::Sync),
            other => Err(AppError::Validation(format!(
                "unknown submission mode '{other}', expected 'sync' or 'async'"
            ))),
        }
    }
}

/// Command to submit a file for import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitImportCommand {
    pub file_name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub options: ParserOptions,
    pub mode: SubmitMode,
}

/// Errors that can occur when submitting an import
#[derive(Debug, thiserror::Error)]
pub enum SubmitImportError {
    /// Filename was empty
    #[error("File name is required and cannot be empty")]
    FilenameRequired,
    /// Filename exceeded maximum length
    #[error("File name must not exceed 255 characters")]
    FilenameLength,
    /// Engine-side rejection or failure
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<SubmitImportError> for AppError {
    fn from(err: SubmitImportError) -> Self {
        match err {
            SubmitImportError::App(app) => app,
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl Request<Result<ImportJobDetails, SubmitImportError>> for SubmitImportCommand {}

impl SubmitImportCommand {
    pub fn validate(&self) -> Result<(), SubmitImportError> {
        if self.file_name.trim().is_empty() {
            return Err(SubmitImportError::FilenameRequired);
        }
        if self.file_name.len() > 255 {
            return Err(SubmitImportError::FilenameLength);
        }
        Ok(())
    }
}

pub async fn handle(
    submission: Arc<ImportSubmission>,
    command: SubmitImportCommand,
) -> Result<ImportJobDetails, SubmitImportError> {
    command.validate()?;

    let params = SubmitParams {
        file_name: command.file_name,
        data: command.content,
        options: command.options,
    };

    let job = match command.mode {
        SubmitMode::Async => submission.submit_async(params).await?,
        SubmitMode::Sync => submission.submit_sync(params).await?,
    };
    Ok(job.into())
}
