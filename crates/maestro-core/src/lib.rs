//! Core types and error definitions for the Maestro orchestrator.
//!
//! This crate provides the foundational types shared across all Maestro
//! crates: the unified error enum, the `Result` alias, and the QA domain
//! models exchanged between the orchestrator and its test agents.
//!
//! # Main types
//!
//! - [`MaestroError`] — Unified error enum for all Maestro subsystems.
//! - [`MaestroResult`] — Convenience alias for `Result<T, MaestroError>`.
//! - [`TestCase`] / [`TestStep`] — A test case as managed by the test
//!   management system and executed by remote agents.
//! - [`TestExecutionResult`] — The outcome of one executed test case.

pub mod models;

pub use models::*;

/// Top-level error type for the Maestro orchestrator.
///
/// The variants mirror the externally observable failure classes: routing
/// failures are reported as "not found", a contended exclusivity gate as
/// "busy, retry later", and a missed execution deadline as a timeout —
/// each distinct from transport errors and from tasks that genuinely
/// finished in a failed state.
#[derive(Debug, thiserror::Error)]
pub enum MaestroError {
    /// No agent is registered, or no agent could be resolved for a task.
    #[error("Routing error: {0}")]
    Routing(String),

    /// The exclusivity gate could not be acquired within the bounded wait.
    #[error("Service busy: {0}")]
    Busy(String),

    /// An outbound HTTP request or JSON-RPC exchange failed at the
    /// transport or protocol level.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A remote task reached a terminal `failed` state.
    #[error("Task error: {0}")]
    Task(String),

    /// A deadline expired while waiting for a terminal task state.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A terminal task produced no usable output, or structured extraction
    /// yielded nothing.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// An incoming trigger request was malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from a test-management or reporting collaborator.
    #[error("Reporting error: {0}")]
    Report(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`MaestroError`].
pub type MaestroResult<T> = Result<T, MaestroError>;
