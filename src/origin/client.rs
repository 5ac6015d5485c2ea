use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::warn;

use crate::headers::HttpMetadata;
use crate::retry::RetryPolicy;

/// A single-interval byte range as reported by the origin's response,
/// forwarded verbatim into the Content-Range calculation — the client
/// never synthesizes 206 itself.
#[derive(Debug, Clone, Copy)]
pub struct RangeDescriptor {
    pub offset: u64,
    pub length: u64,
    pub total_size: u64,
}

/// Options forwarded verbatim to the origin request.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Raw `Range` header value, passed through unparsed.
    pub range: Option<String>,
    /// `If-None-Match` value for a conditional request.
    pub if_none_match: Option<String>,
    /// When true, issue a HEAD instead of a GET (body withheld either way).
    pub head_only: bool,
}

/// An object fetched from the origin, with or without a body.
pub struct OriginObject {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub content_type: Option<String>,
    pub http_metadata: HttpMetadata,
    pub body: Option<ByteStream>,
    /// Present only when the origin served a partial response.
    pub range: Option<RangeDescriptor>,
}

/// Outcome of an origin fetch.
pub enum FetchResult {
    Body(OriginObject),
    NotModified { etag: String },
    NotFound,
    Error(String),
}

/// Wraps `aws_sdk_s3::Client` with the bounded-retry policy from §4.E.
pub struct OriginClient {
    client: Client,
    bucket: String,
    retry_policy: RetryPolicy,
}

impl OriginClient {
    pub fn new(client: Client, bucket: String, retry_policy: RetryPolicy) -> Self {
        Self { client, bucket, retry_policy }
    }

    /// Build the `aws-sdk-s3` client a bucket's configuration describes:
    /// static credentials, region, and an optional custom endpoint for
    /// S3-compatible backends (MinIO, R2, ...).
    pub async fn client_from_config(s3: &crate::config::bucket::S3Config) -> Client {
        let credentials = aws_credential_types::Credentials::new(
            s3.access_key.clone(),
            s3.secret_key.clone(),
            None,
            None,
            "gateway-static",
        );

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(s3.timeout))
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(s3.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(timeout_config);
        if let Some(endpoint) = &s3.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        Client::new(&loader.load().await)
    }

    /// Fetch `key` from the bound bucket, retrying transport failures per
    /// the configured policy. Negative lookups (`NoSuchKey`) are returned
    /// immediately without retry.
    pub async fn fetch(&self, key: &str, opts: &FetchOptions) -> FetchResult {
        let mut attempt = 0u32;
        loop {
            let result = if opts.head_only {
                self.do_head(key, opts).await
            } else {
                self.do_get(key, opts).await
            };

            match result {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retryable(msg) => {
                    if self.retry_policy.should_retry(attempt) {
                        let delay = self.retry_policy.backoff_duration(attempt + 1);
                        warn!(key, attempt, %msg, "origin fetch failed, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    warn!(key, attempt, %msg, "origin fetch exhausted retries");
                    return FetchResult::Error(msg);
                }
            }
        }
    }

    async fn do_get(&self, key: &str, opts: &FetchOptions) -> Attempt {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(range) = &opts.range {
            request = request.range(range);
        }
        if let Some(etag) = &opts.if_none_match {
            request = request.if_none_match(etag);
        }

        match request.send().await {
            Ok(output) => Attempt::Done(self.object_from_get_output(key, output)),
            Err(err) => {
                if let Some(service_err) = err.as_service_error() {
                    if service_err.is_no_such_key() {
                        return Attempt::Done(FetchResult::NotFound);
                    }
                }
                if let Some(raw) = err.raw_response() {
                    let status = raw.status().as_u16();
                    if status == 304 {
                        return Attempt::Done(FetchResult::NotModified { etag: String::new() });
                    }
                    if status < 500 {
                        return Attempt::Done(FetchResult::Error(err.to_string()));
                    }
                }
                Attempt::Retryable(err.to_string())
            }
        }
    }

    async fn do_head(&self, key: &str, opts: &FetchOptions) -> Attempt {
        let mut request = self.client.head_object().bucket(&self.bucket).key(key);
        if let Some(etag) = &opts.if_none_match {
            request = request.if_none_match(etag);
        }

        match request.send().await {
            Ok(output) => {
                let etag = output.e_tag().unwrap_or_default().to_string();
                let size = output.content_length().unwrap_or(0).max(0) as u64;
                let http_metadata = HttpMetadata {
                    content_type: output.content_type().map(str::to_string),
                    last_modified: output.last_modified().map(|d| d.to_string()),
                    content_disposition: output.content_disposition().map(str::to_string),
                    content_encoding: output.content_encoding().map(str::to_string),
                    content_language: output.content_language().map(str::to_string),
                    cache_control: output.cache_control().map(str::to_string),
                };
                Attempt::Done(FetchResult::Body(OriginObject {
                    key: key.to_string(),
                    size,
                    etag,
                    content_type: output.content_type().map(str::to_string),
                    http_metadata,
                    body: None,
                    range: None,
                }))
            }
            Err(err) => {
                if let Some(service_err) = err.as_service_error() {
                    if service_err.is_not_found() {
                        return Attempt::Done(FetchResult::NotFound);
                    }
                }
                if let Some(raw) = err.raw_response() {
                    let status = raw.status().as_u16();
                    if status == 304 {
                        return Attempt::Done(FetchResult::NotModified { etag: String::new() });
                    }
                    if status < 500 {
                        return Attempt::Done(FetchResult::Error(err.to_string()));
                    }
                }
                Attempt::Retryable(err.to_string())
            }
        }
    }

    fn object_from_get_output(
        &self,
        key: &str,
        output: aws_sdk_s3::operation::get_object::GetObjectOutput,
    ) -> FetchResult {
        let etag = output.e_tag().unwrap_or_default().to_string();
        let size = output.content_length().unwrap_or(0).max(0) as u64;
        let content_range = output.content_range().map(str::to_string);

        let http_metadata = HttpMetadata {
            content_type: output.content_type().map(str::to_string),
            last_modified: output.last_modified().map(|d| d.to_string()),
            content_disposition: output.content_disposition().map(str::to_string),
            content_encoding: output.content_encoding().map(str::to_string),
            content_language: output.content_language().map(str::to_string),
            cache_control: output.cache_control().map(str::to_string),
        };

        let range = content_range.as_deref().and_then(parse_content_range);

        FetchResult::Body(OriginObject {
            key: key.to_string(),
            size: range.map(|r| r.total_size).unwrap_or(size),
            etag,
            content_type: output.content_type().map(str::to_string),
            http_metadata,
            body: Some(output.body),
            range,
        })
    }
}

enum Attempt {
    Done(FetchResult),
    Retryable(String),
}

/// Parse an S3 `Content-Range: bytes {start}-{end}/{total}` response
/// header into offset/length/total.
fn parse_content_range(value: &str) -> Option<RangeDescriptor> {
    let rest = value.strip_prefix("bytes ")?;
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end: u64 = end.parse().ok()?;
    let total_size: u64 = total.parse().ok()?;
    Some(RangeDescriptor {
        offset: start,
        length: end - start + 1,
        total_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_range_header() {
        let r = parse_content_range("bytes 0-1023/4096").unwrap();
        assert_eq!(r.offset, 0);
        assert_eq!(r.length, 1024);
        assert_eq!(r.total_size, 4096);
    }

    #[test]
    fn rejects_malformed_content_range() {
        assert!(parse_content_range("not-a-range").is_none());
        assert!(parse_content_range("bytes 0-10").is_none());
    }
}
