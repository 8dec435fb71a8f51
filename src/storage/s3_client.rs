// S3-compatible backends built on rust-s3.
//
// The cloud and local backends differ only in region/endpoint and in
// addressing style (virtual-hosted for the hosted provider, path-style for
// MinIO); every operation goes through the same code below.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::Utc;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::BucketConfiguration;
use tracing::{debug, warn};

use super::sigv4::{self, SigningParams, UnsignedRequest};
use super::{
    BucketCreation, CorsPolicy, ObjectInfo, ObjectStorage, StorageError, StorageKind,
    StorageResult,
};
use crate::config::{CloudStorageConfig, LocalStorageConfig};

/// MinIO ignores the region, but request signing still needs one.
const LOCAL_REGION: &str = "us-east-1";

pub struct S3Storage {
    kind: StorageKind,
    region: Region,
    credentials: Credentials,
    path_style: bool,
    http: reqwest::Client,
}

impl S3Storage {
    /// Hosted provider addressed with virtual-hosted-style requests.
    pub fn cloud(config: &CloudStorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Credentials(e.to_string()))?;

        Ok(Self {
            kind: StorageKind::Cloud,
            region: Region::Custom {
                region: config.region.clone(),
                endpoint: config.endpoint.clone(),
            },
            credentials,
            path_style: false,
            http: reqwest::Client::new(),
        })
    }

    /// Local development server addressed with path-style requests.
    pub fn local(config: &LocalStorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Credentials(e.to_string()))?;

        Ok(Self {
            kind: StorageKind::Local,
            region: Region::Custom {
                region: LOCAL_REGION.to_string(),
                endpoint: config.url(),
            },
            credentials,
            path_style: true,
            http: reqwest::Client::new(),
        })
    }

    fn bucket(&self, name: &str) -> StorageResult<Bucket> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| classify(e, name, None))?;

        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }

    /// Host and canonical path addressing the bucket itself.
    fn bucket_address(&self, name: &str) -> (String, String) {
        if self.path_style {
            (self.region.host(), format!("/{}", name))
        } else {
            (format!("{}.{}", name, self.region.host()), "/".to_string())
        }
    }

    fn signing_params(&self) -> StorageResult<SigningParams<'_>> {
        let missing = || StorageError::Credentials("access key and secret key are required".to_string());
        Ok(SigningParams {
            access_key: self.credentials.access_key.as_deref().ok_or_else(missing)?,
            secret_key: self.credentials.secret_key.as_deref().ok_or_else(missing)?,
            session_token: self.credentials.session_token.as_deref(),
            region: self.region_name(),
            time: Utc::now(),
        })
    }

    fn region_name(&self) -> &str {
        match &self.region {
            Region::Custom { region, .. } => region,
            _ => LOCAL_REGION,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn kind(&self) -> StorageKind {
        self.kind
    }

    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let response = Bucket::list_buckets(self.region.clone(), self.credentials.clone())
            .await
            .map_err(|e| classify(e, "", None))?;

        Ok(response.bucket_names().collect())
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        // One-key ListObjectsV2 on the bucket itself; bucket-scoped tokens
        // cannot list the account's buckets.
        let listing = self
            .bucket(bucket)?
            .list_page(String::new(), None, None, None, Some(1))
            .await;
        match listing {
            Ok(_) => Ok(true),
            Err(e) => match classify(e, bucket, None) {
                StorageError::BucketNotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation> {
        let config = BucketConfiguration::default();
        let result = if self.path_style {
            Bucket::create_with_path_style(bucket, self.region.clone(), self.credentials.clone(), config)
                .await
        } else {
            Bucket::create(bucket, self.region.clone(), self.credentials.clone(), config).await
        };

        let (status, body) = match result {
            Ok(response) if response.success() => return Ok(BucketCreation::Created),
            Ok(response) => (response.response_code, response.response_text),
            Err(S3Error::HttpFailWithBody(status, body)) => (status, body),
            Err(e) => return Err(StorageError::Provider(e.to_string())),
        };

        if error_code(&body) == Some("BucketAlreadyOwnedByYou") {
            debug!("Bucket {} already owned by us", bucket);
            return Ok(BucketCreation::AlreadyOwned);
        }
        Err(classify_status(status, &body, bucket, None))
    }

    // Signed by hand: rust-s3 0.34 sends `?cors` as part of the object key
    // and drops the configuration body.
    async fn put_bucket_cors(&self, bucket: &str, policy: &CorsPolicy) -> StorageResult<()> {
        let body = cors_configuration_xml(policy);
        let (host, path) = self.bucket_address(bucket);
        let content_md5 = BASE64.encode(md5::compute(body.as_bytes()).0);

        let headers = sigv4::sign(
            &self.signing_params()?,
            UnsignedRequest {
                method: "PUT",
                host: &host,
                path: &path,
                query: "cors=",
                headers: vec![
                    ("content-md5".to_string(), content_md5),
                    ("content-type".to_string(), "application/xml".to_string()),
                ],
                payload: body.as_bytes(),
            },
        )?;

        let url = format!("{}://{}{}?cors", self.region.scheme(), host, path);
        let mut request = self.http.put(&url).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), &text, bucket, None))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StorageResult<()> {
        self.bucket(bucket)?
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| classify(e, bucket, Some(key)))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(|e| classify(e, bucket, Some(key)))?;
        Ok(response.bytes().clone())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectInfo>> {
        match self.bucket(bucket)?.head_object(key).await {
            Ok((head, _status)) => Ok(Some(ObjectInfo {
                size: head.content_length.unwrap_or_default().max(0) as u64,
                content_type: head.content_type,
            })),
            Err(e) => match classify(e, bucket, Some(key)) {
                StorageError::ObjectNotFound { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.bucket(bucket)?
            .delete_object(key)
            .await
            .map_err(|e| classify(e, bucket, Some(key)))?;
        Ok(())
    }

    async fn presign_put(&self, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String> {
        self.bucket(bucket)?
            .presign_put(key, expiry_secs, None)
            .await
            .map_err(|e| classify(e, bucket, Some(key)))
    }

    async fn presign_get(&self, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String> {
        self.bucket(bucket)?
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| classify(e, bucket, Some(key)))
    }
}

fn classify(err: S3Error, bucket: &str, key: Option<&str>) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(status, body) => classify_status(status, &body, bucket, key),
        S3Error::Credentials(e) => StorageError::Credentials(e.to_string()),
        other => {
            warn!("Storage call failed for bucket {}: {}", bucket, other);
            StorageError::Provider(other.to_string())
        }
    }
}

/// Map an S3 error response onto the storage error taxonomy.
fn classify_status(status: u16, body: &str, bucket: &str, key: Option<&str>) -> StorageError {
    let code = error_code(body);
    let message = error_message(body).unwrap_or(body).trim().to_string();

    match (status, code) {
        (_, Some("TooManyBuckets")) => StorageError::QuotaExceeded(message),
        (_, Some("BucketAlreadyExists")) => StorageError::BucketNameConflict(bucket.to_string()),
        (_, Some("InvalidBucketName")) => StorageError::InvalidBucketName {
            name: bucket.to_string(),
            reason: message,
        },
        (_, Some("NoSuchBucket")) => StorageError::BucketNotFound(bucket.to_string()),
        (_, Some("NoSuchKey")) => StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.unwrap_or_default().to_string(),
        },
        (401 | 403, _) | (_, Some("AccessDenied")) => StorageError::AccessDenied(if message.is_empty() {
            format!("HTTP {}", status)
        } else {
            message
        }),
        (404, _) => match key {
            Some(key) => StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            None => StorageError::BucketNotFound(bucket.to_string()),
        },
        _ => StorageError::Provider(format!("HTTP {}: {}", status, message)),
    }
}

fn cors_configuration_xml(policy: &CorsPolicy) -> String {
    let mut rule = format!("<ID>{}</ID>", xml_escape(&policy.id));
    let groups = [
        ("AllowedOrigin", &policy.allowed_origins),
        ("AllowedMethod", &policy.allowed_methods),
        ("AllowedHeader", &policy.allowed_headers),
        ("ExposeHeader", &policy.expose_headers),
    ];
    for (tag, values) in groups {
        for value in values {
            rule.push_str(&format!("<{tag}>{}</{tag}>", xml_escape(value)));
        }
    }
    rule.push_str(&format!("<MaxAgeSeconds>{}</MaxAgeSeconds>", policy.max_age_secs));

    format!(
        "<CORSConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><CORSRule>{}</CORSRule></CORSConfiguration>",
        rule
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn error_code(body: &str) -> Option<&str> {
    xml_tag(body, "Code")
}

fn error_message(body: &str) -> Option<&str> {
    xml_tag(body, "Message")
}

fn xml_tag<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(&body[start..end])
}
