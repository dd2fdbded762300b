//! This file defines the trace-aggregator binary entry point.

use std::sync::Arc;

use trace_aggregator::app;
use trace_aggregator::app_state::AppState;
use trace_aggregator::cli;
use trace_aggregator::metrics;
use trace_aggregator::server;
use trace_aggregator::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    println!("{:?}", args);
    tracing::init_tracing();
    metrics::register_metrics();
    let state = Arc::new(AppState::new(&args));
    let service = app::router(state);
    server::serve(&args, service).await;
}
