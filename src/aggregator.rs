//! Track aggregation pipelines.
//!
//! Two flows operate on the bucket. The aggregation flow merges every archive
//! waiting under the backlog prefix into the cumulative yearly file, thinning
//! each daily track on the way in. The reduction-only flow re-thins a single
//! existing archive, optionally writing a dated backup of it first.
//!
//! Both flows are strictly sequential: one file at a time, storage calls being
//! the only await points, with no retries. A failure aborts the current
//! invocation and already-committed side effects (deleted backlog files) stay
//! committed.

use time::OffsetDateTime;

use crate::error::AggregatorError;
use crate::metrics;
use crate::models::FeatureCollection;
use crate::object_store::ObjectStore;
use crate::reduction::{reduce_features, ReductionFactor, ReductionStats};
use crate::zip_codec;

/// Prefix under which not-yet-aggregated daily archives wait.
pub const BACKLOG_PREFIX: &str = "backlog";

/// Extension of the archive objects this pipeline consumes and produces.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Name of the yearly GeoJSON document, used as the archive entry name.
///
/// Computed from the supplied timestamp on every invocation, so a process
/// alive across a year boundary starts a fresh file for the new year.
///
/// # Arguments
///
/// * `now`: Current processing time
pub fn yearly_filename(now: OffsetDateTime) -> String {
    format!("{}-tracks.geojson", now.year())
}

/// Name of the yearly archive object in the bucket.
///
/// # Arguments
///
/// * `now`: Current processing time
pub fn yearly_archive_name(now: OffsetDateTime) -> String {
    format!("{}-tracks.geojson.zip", now.year())
}

/// Name of a backup object for `filename`, stamped with the current date.
///
/// # Arguments
///
/// * `now`: Current processing time
/// * `filename`: Name of the object being backed up
pub fn backup_archive_name(now: OffsetDateTime, filename: &str) -> String {
    format!(
        "{:04}_{:02}_{:02}#{}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        filename
    )
}

/// Strip the archive extension from an object name, for use as an entry name.
///
/// # Arguments
///
/// * `name`: Archive object name
pub fn strip_archive_extension(name: &str) -> &str {
    name.strip_suffix(ARCHIVE_EXTENSION).unwrap_or(name)
}

/// Aggregation service driving the track bucket.
pub struct Aggregator<S> {
    /// Gateway to the object storage bucket.
    store: S,
}

impl<S: ObjectStore> Aggregator<S> {
    /// Return a new Aggregator on top of the given store.
    ///
    /// # Arguments
    ///
    /// * `store`: Gateway to the object storage bucket
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Merge all backlog archives into the yearly cumulative track file.
    ///
    /// Lists archives under the backlog prefix, reduces each one's
    /// coordinates by the factor (default 50) and appends its features to the
    /// yearly collection, deleting each backlog object right after its merge
    /// unless `keep_backlog` is set. The yearly file is written once, at the
    /// end. An empty backlog is a successful no-op that never touches the
    /// yearly file; a missing yearly file means the first run of the year and
    /// starts an empty collection.
    ///
    /// # Arguments
    ///
    /// * `reduction_factor`: Optional coordinate reduction factor
    /// * `keep_backlog`: Set to true to preserve processed backlog objects
    #[tracing::instrument(level = "INFO", skip(self))]
    pub async fn run(
        &self,
        reduction_factor: Option<f64>,
        keep_backlog: bool,
    ) -> Result<(), AggregatorError> {
        let factor = ReductionFactor::resolve(reduction_factor)?;
        tracing::info!("Building yearly cumulative track");

        let backlog: Vec<String> = self
            .store
            .list(BACKLOG_PREFIX)
            .await?
            .into_iter()
            .filter(|name| name.ends_with(ARCHIVE_EXTENSION))
            .collect();
        if backlog.is_empty() {
            tracing::info!("No file to process in the backlog");
            return Ok(());
        }

        let now = OffsetDateTime::now_utc();
        let archive_name = yearly_archive_name(now);
        tracing::info!("Downloading yearly archive: {}", archive_name);
        let mut yearly = match self.load_collection(&archive_name).await {
            Ok(collection) => collection,
            Err(AggregatorError::ObjectNotFound { object }) => {
                // First run of the year.
                tracing::warn!("{} not found, starting a new yearly collection", object);
                FeatureCollection::new()
            }
            Err(err) => return Err(AggregatorError::AggregationFailed(Box::new(err))),
        };

        let total = backlog.len();
        let mut stats = ReductionStats::default();
        for (index, name) in backlog.iter().enumerate() {
            tracing::info!(
                "{}/{} Integrating file into yearly tracks: {}",
                index + 1,
                total,
                name
            );
            let mut daily = self.load_collection(name).await?;
            stats += reduce_features(&mut daily, factor);
            yearly.append(&mut daily);
            if !keep_backlog {
                self.store.delete(name).await?;
            }
            metrics::BACKLOG_FILES_AGGREGATED.inc();
        }

        metrics::COORDINATES_PROCESSED
            .with_label_values(&["initial"])
            .inc_by(stats.initial as u64);
        metrics::COORDINATES_PROCESSED
            .with_label_values(&["reduced"])
            .inc_by(stats.reduced as u64);

        tracing::info!(
            "Storing new yearly trace map: {} files, {} -> {} coordinates",
            total,
            stats.initial,
            stats.reduced
        );
        self.store_collection(&yearly, &yearly_filename(now), &archive_name)
            .await
    }

    /// Reduce the coordinates of an existing tracks archive in place.
    ///
    /// When no filename is given the current yearly archive is the target.
    /// With `do_backup` set, the pre-reduction text is re-wrapped and stored
    /// under a date-stamped backup name before anything is reduced; a failed
    /// backup aborts the operation.
    ///
    /// # Arguments
    ///
    /// * `filename`: Optional archive object name, defaults to the yearly one
    /// * `reduction_factor`: Optional coordinate reduction factor
    /// * `do_backup`: Set to true to store a backup before reducing
    #[tracing::instrument(level = "INFO", skip(self))]
    pub async fn reduce_tracks_file(
        &self,
        filename: Option<String>,
        reduction_factor: Option<f64>,
        do_backup: bool,
    ) -> Result<(), AggregatorError> {
        let factor = ReductionFactor::resolve(reduction_factor)?;
        let now = OffsetDateTime::now_utc();
        let filename = filename
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| yearly_archive_name(now));
        tracing::info!(
            "Reducing tracks archive: {} (stride {})",
            filename,
            factor.stride()
        );

        let data = self.store.download(&filename).await?;
        // The unwrapped text is kept verbatim: it is what a backup stores.
        let text = zip_codec::unwrap_single_entry(&data)?;
        let mut collection = FeatureCollection::from_geojson(&text)?;

        if do_backup {
            let backup_name = backup_archive_name(now, &filename);
            let wrapped =
                zip_codec::wrap_single_entry(&text, strip_archive_extension(&filename))?;
            self.store.upload(&backup_name, wrapped).await?;
            tracing::info!("Backup of file made: {} -> {}", filename, backup_name);
        }

        reduce_features(&mut collection, factor);

        tracing::info!("Storing reduced file: {}", filename);
        self.store_collection(&collection, strip_archive_extension(&filename), &filename)
            .await
    }

    /// Download an archive and decode its entry into a feature collection.
    async fn load_collection(&self, name: &str) -> Result<FeatureCollection, AggregatorError> {
        let data = self.store.download(name).await?;
        let text = zip_codec::unwrap_single_entry(&data)?;
        FeatureCollection::from_geojson(&text)
    }

    /// Encode a feature collection and upload it as a single-entry archive.
    async fn store_collection(
        &self,
        collection: &FeatureCollection,
        entry_name: &str,
        archive_name: &str,
    ) -> Result<(), AggregatorError> {
        let text = collection.to_geojson()?;
        let data = zip_codec::wrap_single_entry(&text, entry_name)?;
        self.store.upload(archive_name, data).await
    }
}
