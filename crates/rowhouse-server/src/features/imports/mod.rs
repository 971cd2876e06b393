//! The imports feature: submission, previewing, progress, record queries,
//! and import management.

pub mod commands;
pub mod queries;
pub mod routes;
