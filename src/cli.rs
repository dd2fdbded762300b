//! Command Line Interface (CLI) arguments.

use clap::Parser;
use url::Url;

/// Trace aggregator command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "TRACE_AGGREGATOR_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "TRACE_AGGREGATOR_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "TRACE_AGGREGATOR_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/trace-aggregator/certs/cert.pem",
        env = "TRACE_AGGREGATOR_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/trace-aggregator/certs/key.pem",
        env = "TRACE_AGGREGATOR_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "TRACE_AGGREGATOR_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// URL of the S3-compatible object store holding the track bucket
    #[arg(
        long,
        default_value = "http://localhost:9000",
        env = "TRACE_AGGREGATOR_S3_URL"
    )]
    pub s3_url: Url,
    /// Object storage access key
    #[arg(long, env = "TRACE_AGGREGATOR_S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,
    /// Object storage secret key
    #[arg(long, env = "TRACE_AGGREGATOR_S3_SECRET_KEY")]
    pub s3_secret_key: Option<String>,
    /// Name of the bucket holding backlog, yearly and backup track files
    #[arg(
        long,
        default_value = "tracemap-trace-aggregator",
        env = "TRACE_AGGREGATOR_BUCKET"
    )]
    pub bucket: String,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
