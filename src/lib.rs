//! This crate provides a GPS trace aggregation service. It merges the daily track archives a
//! recorder drops into an object storage bucket into a single cumulative yearly GeoJSON file,
//! thinning each track's coordinate sequence on the way in so the yearly file stays small enough
//! to render on a map.
//!
//! Tracks are stored as single-entry zip archives containing GeoJSON feature collections. Daily
//! files queue up under a backlog prefix until an HTTP trigger runs the aggregation; a second
//! trigger flow re-thins an existing archive in place, with an optional dated backup.
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team. Axum performs well in [various](https://github.com/programatik29/rust-web-benchmarks/blob/master/result/hello-world.md) [benchmarks](https://web-frameworks-benchmark.netlify.app/result?l=rust)
//!   and is built on top of various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of GeoJSON documents and response data.
//! * [AWS SDK for S3](aws-sdk-s3) is used to interact with S3-compatible object stores.
//! * [zip] reads and writes the single-entry archive containers used for all stored objects.

pub mod aggregator;
pub mod app;
pub mod app_state;
pub mod cli;
pub mod error;
pub mod metrics;
pub mod models;
pub mod object_store;
pub mod reduction;
pub mod s3_client;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_query;
pub mod zip_codec;
