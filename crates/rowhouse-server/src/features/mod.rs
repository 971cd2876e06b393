//! Feature routers (CQRS-style: commands mutate, queries read).

pub mod imports;
pub mod shared;

use std::sync::Arc;

use axum::Router;

use crate::ingest::ImportSubmission;
use crate::parser::ParserRegistry;
use crate::repo::Repositories;

/// Dependencies shared by every feature handler.
#[derive(Clone)]
pub struct FeatureState {
    pub repos: Repositories,
    pub registry: Arc<ParserRegistry>,
    pub submission: Arc<ImportSubmission>,
}

/// Assemble the versioned API router.
pub fn router(state: FeatureState) -> Router {
    Router::new()
        .merge(imports::routes::import_routes())
        .with_state(state)
}
