//! Error handling.

use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_object::DeleteObjectError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_smithy_types::byte_stream::error::Error as ByteStreamError;
use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Trace aggregator error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// Unexpected failure while loading the yearly track file
    #[error("aggregation failed")]
    AggregationFailed(#[source] Box<AggregatorError>),

    /// Archive with no entries
    #[error("archive contains no entries")]
    ArchiveEmpty,

    /// Error reading an archive entry as UTF-8 text
    #[error("failed to read archive entry")]
    ArchiveEntry(#[from] std::io::Error),

    /// Corrupt or unreadable archive container
    #[error("failed to open archive")]
    ArchiveInvalid(#[from] zip::result::ZipError),

    /// Error decoding GeoJSON text into a feature collection
    #[error("object does not contain a valid GeoJSON feature collection")]
    GeoJsonParse(#[source] serde_json::Error),

    /// Error encoding a feature collection as GeoJSON text
    #[error("failed to serialise GeoJSON feature collection")]
    GeoJsonSerialise(#[source] serde_json::Error),

    /// Reduction factor below 1 or not a finite number
    #[error("invalid reduction factor {factor}")]
    InvalidReductionFactor { factor: f64 },

    /// Missing storage object
    #[error("object {object} not found in storage")]
    ObjectNotFound { object: String },

    /// Error deserialising trigger query parameters
    #[error("request query parameters are not valid")]
    QueryRejection(#[from] QueryRejection),

    /// Error validating trigger query parameters
    #[error("request query parameters are not valid")]
    QueryValidation(#[from] validator::ValidationErrors),

    /// Error reading object data from S3
    #[error("error receiving object from S3 storage")]
    S3ByteStream(#[from] ByteStreamError),

    /// Error while deleting an object from S3
    #[error("error deleting object from S3 storage")]
    S3DeleteObject(#[from] SdkError<DeleteObjectError>),

    /// Error while retrieving an object from S3
    #[error("error retrieving object from S3 storage")]
    S3GetObject(#[from] SdkError<GetObjectError>),

    /// Error while listing objects in S3
    #[error("error listing objects in S3 storage")]
    S3ListObjects(#[from] SdkError<ListObjectsV2Error>),

    /// Error while storing an object in S3
    #[error("error storing object in S3 storage")]
    S3PutObject(#[from] SdkError<PutObjectError>),
}

impl IntoResponse for AggregatorError {
    /// Convert from an `AggregatorError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 401 unauthorised ErrorResponse
    fn unauthorised<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::UNAUTHORIZED, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<AggregatorError> for ErrorResponse {
    /// Convert from an `AggregatorError` into an `ErrorResponse`.
    fn from(error: AggregatorError) -> Self {
        let response = match &error {
            // Bad request
            AggregatorError::ArchiveEmpty
            | AggregatorError::ArchiveEntry(_)
            | AggregatorError::ArchiveInvalid(_)
            | AggregatorError::GeoJsonParse(_)
            | AggregatorError::InvalidReductionFactor { factor: _ }
            | AggregatorError::QueryRejection(_)
            | AggregatorError::QueryValidation(_) => Self::bad_request(&error),

            // Not found
            AggregatorError::ObjectNotFound { object: _ } => Self::not_found(&error),

            // Internal server error
            AggregatorError::AggregationFailed(_)
            | AggregatorError::GeoJsonSerialise(_)
            | AggregatorError::S3ByteStream(_)
            | AggregatorError::S3DeleteObject(_)
            | AggregatorError::S3ListObjects(_)
            | AggregatorError::S3PutObject(_) => Self::internal_server_error(&error),

            AggregatorError::S3GetObject(sdk_error) => {
                // Tailor the response based on the specific SdkError variant.
                match &sdk_error {
                    // These are generic SdkError variants.
                    // Internal server error
                    SdkError::ConstructionFailure(_)
                    | SdkError::DispatchFailure(_)
                    | SdkError::ResponseError(_)
                    | SdkError::TimeoutError(_) => Self::internal_server_error(&error),

                    // This is a more specific ServiceError variant, with GetObjectError as the
                    // inner error.
                    SdkError::ServiceError(get_obj_error) => {
                        let get_obj_error = get_obj_error.err();
                        match get_obj_error {
                            GetObjectError::InvalidObjectState(_)
                            | GetObjectError::NoSuchKey(_) => Self::bad_request(&error),

                            // Quite a lot of error cases end up as unhandled. Attempt to determine
                            // the error from the code.
                            _ => {
                                match get_obj_error.code() {
                                    // Bad request
                                    Some("NoSuchBucket") => Self::bad_request(&error),

                                    // Unauthorised
                                    Some("InvalidAccessKeyId")
                                    | Some("SignatureDoesNotMatch")
                                    | Some("AccessDenied") => Self::unauthorised(&error),

                                    // Internal server error
                                    _ => Self::internal_server_error(&error),
                                }
                            }
                        }
                    }

                    // The enum is marked as non-exhaustive
                    _ => Self::internal_server_error(&error),
                }
            }
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
