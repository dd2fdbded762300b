//! Object storage gateway trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::AggregatorError;

/// Interface to the object storage bucket holding track files.
///
/// This forms the contract between the aggregation pipelines and storage.
/// The production implementation is [S3Client](crate::s3_client::S3Client);
/// tests substitute an in-memory store.
#[async_trait]
pub trait ObjectStore {
    /// List the names of objects whose name starts with `prefix`.
    ///
    /// The order of the returned names is whatever the store provides; the
    /// pipelines do not re-sort it.
    ///
    /// # Arguments
    ///
    /// * `prefix`: Object name prefix to filter on
    async fn list(&self, prefix: &str) -> Result<Vec<String>, AggregatorError>;

    /// Download an object and return its data.
    ///
    /// Fails with [AggregatorError::ObjectNotFound] if no object with that
    /// name exists.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the object in the bucket
    async fn download(&self, name: &str) -> Result<Bytes, AggregatorError>;

    /// Upload an object, overwriting any existing object with the same name.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the object in the bucket
    /// * `data`: Object content
    async fn upload(&self, name: &str, data: Bytes) -> Result<(), AggregatorError>;

    /// Delete an object by name.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the object in the bucket
    async fn delete(&self, name: &str) -> Result<(), AggregatorError>;
}
