//! HTTP API for triggering the aggregation pipelines.

use crate::aggregator::Aggregator;
use crate::app_state::SharedAppState;
use crate::error::AggregatorError;
use crate::metrics;
use crate::object_store::ObjectStore;
use crate::validated_query::ValidatedQuery;

use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use validator::Validate;

/// Acknowledgment text returned after a successful trigger run.
pub const COMPLETION_ACK: &str = "[trace-aggregator] Done!";

/// Query parameters accepted by the trigger endpoint.
///
/// Each parameter is a typed field; an unparseable or unknown parameter
/// rejects the request.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TriggerParams {
    /// Select the reduce-existing-file flow instead of backlog aggregation.
    #[serde(default)]
    pub reduce: bool,
    /// Target tracks archive name. Only used by the reduce flow; defaults to
    /// the current yearly archive.
    pub filename: Option<String>,
    /// Coordinate reduction factor.
    #[validate(range(min = 1.0, message = "factor must be at least 1"))]
    pub factor: Option<f64>,
    /// Set to true to preserve backlog files once processed.
    #[serde(default, rename = "keepBacklog")]
    pub keep_backlog: bool,
}

/// Return the application router.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router<S>(state: SharedAppState<S>) -> Router
where
    S: ObjectStore + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(trigger::<S>))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Trigger endpoint.
///
/// Dispatches to the reduction-only pipeline when `reduce` is set, otherwise
/// to backlog aggregation. The reduce flow always takes a backup first when
/// driven over HTTP.
async fn trigger<S>(
    State(state): State<SharedAppState<S>>,
    ValidatedQuery(params): ValidatedQuery<TriggerParams>,
) -> Result<&'static str, AggregatorError>
where
    S: ObjectStore + Clone + Send + Sync + 'static,
{
    let aggregator = Aggregator::new(state.store.clone());
    if params.reduce {
        aggregator
            .reduce_tracks_file(params.filename, params.factor, true)
            .await?;
    } else {
        aggregator.run(params.factor, params.keep_backlog).await?;
    }
    Ok(COMPLETION_ACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{strip_archive_extension, yearly_archive_name};
    use crate::app_state::AppState;
    use crate::cli::CommandLineArgs;
    use crate::test_utils::{track_collection, zip_collection, InMemoryStore};
    use crate::zip_codec;

    use axum::{
        body::Body,
        http::{self, Request, StatusCode},
        response::Response,
    };
    use clap::Parser;
    use regex::Regex;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tower::ServiceExt; // for `oneshot` and `ready`

    fn test_state(store: InMemoryStore) -> SharedAppState<InMemoryStore> {
        let args = CommandLineArgs::parse_from(["trace-aggregator"]);
        Arc::new(AppState::with_store(&args, store))
    }

    async fn request(store: InMemoryStore, uri: &str) -> Response {
        router(test_state(store))
            .oneshot(
                Request::builder()
                    .method(http::Method::GET)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let response = request(InMemoryStore::new(), "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }

    #[tokio::test]
    async fn trigger_aggregates_backlog() {
        let store = InMemoryStore::new();
        let daily = track_collection(&[100]);
        store
            .insert(
                "backlog/day1.geojson.zip",
                zip_collection(&daily, "day1.geojson"),
            )
            .await;

        let response = request(store.clone(), "/?factor=10").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, COMPLETION_ACK);

        let archive_name = yearly_archive_name(OffsetDateTime::now_utc());
        assert_eq!(store.names().await, vec![archive_name]);
    }

    #[tokio::test]
    async fn trigger_empty_backlog_still_acknowledges() {
        let response = request(InMemoryStore::new(), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, COMPLETION_ACK);
    }

    #[tokio::test]
    async fn trigger_keeps_backlog_when_asked() {
        let store = InMemoryStore::new();
        let daily = track_collection(&[10]);
        store
            .insert(
                "backlog/day1.geojson.zip",
                zip_collection(&daily, "day1.geojson"),
            )
            .await;

        let response = request(store.clone(), "/?factor=2&keepBacklog=true").await;
        assert_eq!(response.status(), StatusCode::OK);

        let names = store.names().await;
        assert!(names.contains(&"backlog/day1.geojson.zip".to_string()));
    }

    #[tokio::test]
    async fn trigger_reduce_flow_takes_backup() {
        let store = InMemoryStore::new();
        let archive_name = yearly_archive_name(OffsetDateTime::now_utc());
        let collection = track_collection(&[7]);
        store
            .insert(
                &archive_name,
                zip_collection(&collection, strip_archive_extension(&archive_name)),
            )
            .await;

        let response = request(store.clone(), "/?reduce=true&factor=2").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, COMPLETION_ACK);

        let names = store.names().await;
        assert!(names.iter().any(|name| name.contains('#')));
        let data = store.get(&archive_name).await.unwrap();
        let text = zip_codec::unwrap_single_entry(&data).unwrap();
        let reduced = crate::models::FeatureCollection::from_geojson(&text).unwrap();
        assert_eq!(reduced.features[0].geometry.coordinates.len(), 4);
    }

    #[tokio::test]
    async fn trigger_missing_reduce_target_is_not_found() {
        let response = request(
            InMemoryStore::new(),
            "/?reduce=true&filename=missing.geojson.zip",
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn trigger_invalid_factor() {
        let response = request(InMemoryStore::new(), "/?factor=0.5").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_string(response).await;
        let re = Regex::new(r".*factor: factor must be at least 1.*").unwrap();
        assert!(re.is_match(&body[..]), "body: {body}");
    }

    #[tokio::test]
    async fn trigger_unknown_parameter() {
        let response = request(InMemoryStore::new(), "/?frobnicate=1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
