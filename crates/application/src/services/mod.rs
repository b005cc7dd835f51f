//! Application services
//!
//! Services orchestrate ports: the retrieval path (search aggregation and
//! page fetching) and the answer path (stream reconciliation).

mod answer_service;
mod fetch_orchestrator;
mod search_aggregator;
mod stream_reconciler;

pub use answer_service::AnswerService;
pub use fetch_orchestrator::{FetchOrchestrator, FetchSettings, PageCoalescer};
pub use search_aggregator::{QueryCoalescer, SearchAggregator, SearchSettings};
pub use stream_reconciler::{
    ReconcileOutcome, ReconcilerState, StreamReconciler, reconcile_stream,
};
