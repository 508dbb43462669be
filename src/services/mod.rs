//! Service layer
//!
//! Services sit between the command tree and the platform ports. They
//! validate input locally, resolve names to IDs, submit work and follow it
//! to completion. Every function takes a `&dyn Platform`, so the same code
//! runs against the HTTP adapter and the in-memory platform.

pub mod catalog;
pub mod ingest;
pub mod log_download;
pub mod metrics_sync;
pub mod observer;
pub mod resolver;
pub mod submission;
pub mod supervisor;
pub mod validation;

pub use ingest::{ingest, IngestOutcome, IngestRequest};
pub use observer::{
    BatchItem, ObserveOptions, Observation, Observer, ObserverConfig, ReportItem, SweepItem,
    WorkItem, WorkflowRunItem,
};
pub use resolver::{resolve, resolve_id, resolve_suite, Resolvable};
pub use submission::{
    BatchRequest, DebugRequest, ExperienceSelection, ReportRequest, SuiteRunRequest,
    SweepRequest, WorkflowRunRequest,
};
pub use supervisor::{supervise, FailureBudget, StopReason, SuperviseReport, SupervisePolicy};
