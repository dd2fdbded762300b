use crate::cli::CommandLineArgs;
use crate::s3_client::{S3Client, S3Credentials};

use std::sync::Arc;

/// Shared application state passed to each request handler.
///
/// Generic over the object store so that tests can run the full trigger flow
/// against an in-memory store.
pub struct AppState<S> {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Gateway to the object storage bucket.
    pub store: S,
}

impl AppState<S3Client> {
    /// Create and return an [AppState] backed by the configured S3 bucket.
    pub fn new(args: &CommandLineArgs) -> Self {
        let credentials = match (&args.s3_access_key, &args.s3_secret_key) {
            (Some(access_key), Some(secret_key)) => {
                S3Credentials::access_key(access_key, secret_key)
            }
            _ => S3Credentials::None,
        };
        let store = S3Client::new(&args.s3_url, credentials, &args.bucket);
        Self::with_store(args, store)
    }
}

impl<S> AppState<S> {
    /// Create and return an [AppState] on top of an existing store.
    pub fn with_store(args: &CommandLineArgs, store: S) -> Self {
        Self {
            args: args.clone(),
            store,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState<S> = Arc<AppState<S>>;
