use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::AggregatorError;
use crate::models::{Feature, FeatureCollection, Geometry, Position};
use crate::object_store::ObjectStore;
use crate::zip_codec;

/// Build a feature collection with one LineString feature per entry in
/// `coordinate_counts`, each holding that many positions.
pub(crate) fn track_collection(coordinate_counts: &[usize]) -> FeatureCollection {
    let mut collection = FeatureCollection::new();
    for count in coordinate_counts {
        collection.features.push(Feature {
            feature_type: "Feature".to_string(),
            geometry: Geometry {
                geometry_type: "LineString".to_string(),
                coordinates: (0..*count)
                    .map(|i| vec![i as f64, -(i as f64)] as Position)
                    .collect(),
            },
            properties: None,
        });
    }
    collection
}

/// Wrap a collection's GeoJSON text into a single-entry archive.
pub(crate) fn zip_collection(collection: &FeatureCollection, entry_name: &str) -> Bytes {
    let text = collection.to_geojson().unwrap();
    zip_codec::wrap_single_entry(&text, entry_name).unwrap()
}

/// In-memory [ObjectStore] used to exercise the pipelines without S3.
///
/// Objects live in a BTreeMap, so listing order is deterministic
/// (lexicographic), matching S3 key-order semantics.
#[derive(Clone, Default)]
pub(crate) struct InMemoryStore {
    objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub(crate) async fn insert(&self, name: &str, data: Bytes) {
        self.objects.write().await.insert(name.to_string(), data);
    }

    /// Fetch an object without going through the trait.
    pub(crate) async fn get(&self, name: &str) -> Option<Bytes> {
        self.objects.read().await.get(name).cloned()
    }

    /// All object names currently stored.
    pub(crate) async fn names(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, AggregatorError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn download(&self, name: &str) -> Result<Bytes, AggregatorError> {
        self.objects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AggregatorError::ObjectNotFound {
                object: name.to_string(),
            })
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<(), AggregatorError> {
        self.objects.write().await.insert(name.to_string(), data);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), AggregatorError> {
        self.objects
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AggregatorError::ObjectNotFound {
                object: name.to_string(),
            })
    }
}
