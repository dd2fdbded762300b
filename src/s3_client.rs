//! A simplified S3 client for the track bucket.
//! It attempts to hide the complexities of working with the AWS SDK for S3.

use crate::error::AggregatorError;
use crate::object_store::ObjectStore;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use bytes::Bytes;
use tracing::Instrument;
use url::Url;

#[derive(Clone)]
pub enum S3Credentials {
    AccessKey {
        access_key: String,
        secret_key: String,
    },
    None,
}

impl S3Credentials {
    /// Create an access key credential.
    pub fn access_key(access_key: &str, secret_key: &str) -> Self {
        S3Credentials::AccessKey {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

/// S3 client object, scoped to the configured track bucket.
#[derive(Clone)]
pub struct S3Client {
    /// Underlying AWS SDK S3 client object.
    client: Client,
    /// Name of the bucket holding backlog, yearly and backup objects.
    bucket: String,
}

impl S3Client {
    /// Creates an S3Client object
    ///
    /// # Arguments
    ///
    /// * `url`: Object storage API URL
    /// * `credentials`: Object storage account credentials
    /// * `bucket`: Name of the bucket holding track objects
    pub fn new(url: &Url, credentials: S3Credentials, bucket: &str) -> Self {
        let region = Region::new("us-east-1");
        let builder = aws_sdk_s3::Config::builder().behavior_version(BehaviorVersion::latest());
        let builder = match credentials {
            S3Credentials::AccessKey {
                access_key,
                secret_key,
            } => {
                let credentials = Credentials::from_keys(access_key, secret_key, None);
                builder.credentials_provider(credentials)
            }
            S3Credentials::None => builder,
        };
        let s3_config = builder
            .region(Some(region))
            .endpoint_url(url.to_string())
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    /// List the names of objects in the bucket with the given prefix.
    ///
    /// Names are returned in the order the service yields them, which for S3
    /// is lexicographic key order.
    ///
    /// # Arguments
    ///
    /// * `prefix`: Object name prefix to filter on
    async fn list(&self, prefix: &str) -> Result<Vec<String>, AggregatorError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();
        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    names.push(key.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Downloads an object from the bucket and returns the data as Bytes.
    ///
    /// A missing object maps onto
    /// [ObjectNotFound](AggregatorError::ObjectNotFound) so that callers can
    /// distinguish it from other storage failures.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the object in the bucket
    async fn download(&self, name: &str) -> Result<Bytes, AggregatorError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .instrument(tracing::Span::current())
            .await;
        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                if let SdkError::ServiceError(service_err) = &err {
                    if service_err.err().is_no_such_key() {
                        return Err(AggregatorError::ObjectNotFound {
                            object: name.to_string(),
                        });
                    }
                }
                return Err(err.into());
            }
        };

        let capacity = usize::try_from(response.content_length().unwrap_or(0)).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);

        // Iterate over the streaming response, copying data into the Vec<u8>.
        while let Some(bytes) = response
            .body
            .try_next()
            .instrument(tracing::Span::current())
            .await?
        {
            buf.extend_from_slice(&bytes)
        }
        Ok(buf.into())
    }

    /// Uploads an object to the bucket, overwriting any existing object.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the object in the bucket
    /// * `data`: Object content
    async fn upload(&self, name: &str, data: Bytes) -> Result<(), AggregatorError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(mime::TEXT_PLAIN.as_ref())
            .body(ByteStream::from(data))
            .send()
            .instrument(tracing::Span::current())
            .await?;
        Ok(())
    }

    /// Deletes an object from the bucket.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the object in the bucket
    async fn delete(&self, name: &str) -> Result<(), AggregatorError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .instrument(tracing::Span::current())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn new() {
        let url = Url::parse("http://example.com").unwrap();
        S3Client::new(
            &url,
            S3Credentials::access_key("user", "password"),
            "tracemap-trace-aggregator",
        );
    }

    #[test]
    fn new_no_auth() {
        let url = Url::parse("http://example.com").unwrap();
        S3Client::new(&url, S3Credentials::None, "tracemap-trace-aggregator");
    }
}
