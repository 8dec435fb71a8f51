//! Bucket lifecycle: naming rules, idempotent creation and browser CORS.

use tracing::{info, warn};

use super::{BucketCreation, ObjectStorage, StorageError, StorageResult};
use crate::config::Environment;

pub const BUCKET_NAME_MIN_LEN: usize = 3;
pub const BUCKET_NAME_MAX_LEN: usize = 63;

/// CORS rule applied to buckets so browsers can PUT/GET presigned URLs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CorsPolicy {
    pub id: String,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age_secs: u32,
}

impl CorsPolicy {
    /// Wide open in development, restricted to the application's own origins
    /// in production.
    pub fn for_environment(environment: Environment, origins: &[String], site_url: Option<&str>) -> Self {
        let allowed_origins = match environment {
            Environment::Development => vec!["*".to_string()],
            Environment::Production => {
                let mut list: Vec<String> = origins.to_vec();
                if let Some(site) = site_url {
                    if !list.iter().any(|o| o == site) {
                        list.push(site.to_string());
                    }
                }
                list
            }
        };

        Self {
            id: "AllowWebAccess".to_string(),
            allowed_origins,
            allowed_methods: ["GET", "PUT", "POST", "DELETE", "HEAD"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: [
                "*",
                "Authorization",
                "Content-Type",
                "x-amz-date",
                "x-amz-content-sha256",
                "x-amz-security-token",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            expose_headers: ["ETag", "x-amz-version-id", "x-amz-request-id", "x-amz-delete-marker"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            max_age_secs: 3600,
        }
    }
}

/// Result of [`ensure_bucket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSetup {
    pub bucket_name: String,
    /// False when the bucket was already there.
    pub created: bool,
    pub cors_configured: bool,
    pub message: String,
}

/// `true` iff `name` is a legal S3 bucket name.
pub fn validate_bucket_name(name: &str) -> bool {
    check_bucket_name(name).is_ok()
}

/// Same rules as [`validate_bucket_name`], reporting which one failed.
pub fn check_bucket_name(name: &str) -> StorageResult<()> {
    let reject = |reason: &str| {
        Err(StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.len() < BUCKET_NAME_MIN_LEN || name.len() > BUCKET_NAME_MAX_LEN {
        return reject("must be between 3 and 63 characters long");
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
    {
        return reject("only lowercase letters, numbers, periods and hyphens are allowed");
    }

    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return reject("must start and end with a letter or number");
    }
    if ["..", ".-", "-.", "--"].iter().any(|p| name.contains(p)) {
        return reject("must not contain consecutive periods or hyphens");
    }
    if looks_like_ipv4(name) {
        return reject("must not be formatted as an IP address");
    }
    Ok(())
}

fn looks_like_ipv4(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Make sure `name` exists on the provider and carries the browser CORS rule.
///
/// Idempotent: an existing bucket is not re-created, and losing a creation race
/// to another process counts as success. A CORS failure is only a warning.
pub async fn ensure_bucket(
    storage: &dyn ObjectStorage,
    name: &str,
    cors: &CorsPolicy,
) -> StorageResult<BucketSetup> {
    check_bucket_name(name)?;

    let (created, mut message) = if storage.bucket_exists(name).await? {
        info!("Bucket {} already exists", name);
        (false, format!("Bucket {} already exists", name))
    } else {
        match storage.create_bucket(name).await? {
            BucketCreation::Created => {
                info!("Created bucket {} on {} storage", name, storage.kind());
                (true, format!("Successfully created bucket {}", name))
            }
            BucketCreation::AlreadyOwned => {
                info!("Bucket {} was created concurrently", name);
                (false, format!("Bucket {} already exists", name))
            }
        }
    };

    let cors_configured = match configure_cors(storage, name, cors).await {
        Ok(()) => {
            message.push_str(" with CORS configured");
            true
        }
        Err(e) => {
            warn!("Failed to set CORS for bucket {}: {}", name, e);
            message.push_str(
                " (Warning: CORS configuration failed - browser uploads may need it configured manually)",
            );
            false
        }
    };

    Ok(BucketSetup {
        bucket_name: name.to_string(),
        created,
        cors_configured,
        message,
    })
}

pub async fn configure_cors(storage: &dyn ObjectStorage, name: &str, cors: &CorsPolicy) -> StorageResult<()> {
    storage.put_bucket_cors(name, cors).await?;
    info!("CORS policy configured for bucket {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn dev_policy() -> CorsPolicy {
        CorsPolicy::for_environment(Environment::Development, &[], None)
    }

    #[test]
    fn test_valid_bucket_names() {
        assert!(validate_bucket_name("my-bucket-1"));
        assert!(validate_bucket_name("abc"));
        assert!(validate_bucket_name("logs.example.com"));
        assert!(validate_bucket_name(&"a".repeat(63)));
    }

    #[test]
    fn test_invalid_bucket_names() {
        assert!(!validate_bucket_name("ab"));
        assert!(!validate_bucket_name(&"a".repeat(64)));
        assert!(!validate_bucket_name("My-Bucket"));
        assert!(!validate_bucket_name("under_score"));
        assert!(!validate_bucket_name("-leading"));
        assert!(!validate_bucket_name("trailing-"));
        assert!(!validate_bucket_name("trailing."));
        assert!(!validate_bucket_name("double..dot"));
        assert!(!validate_bucket_name("dot.-dash"));
        assert!(!validate_bucket_name("dash-.dot"));
        assert!(!validate_bucket_name("double--dash"));
        assert!(!validate_bucket_name("1.2.3.4"));
        assert!(!validate_bucket_name("192.168.10.200"));
        assert!(!validate_bucket_name(""));
    }

    #[test]
    fn test_ip_like_but_not_ip() {
        assert!(validate_bucket_name("1.2.3"));
        assert!(validate_bucket_name("1.2.3.4.5"));
        assert!(validate_bucket_name("1.2.3.a"));
    }

    #[test]
    fn test_check_bucket_name_reason() {
        match check_bucket_name("ab") {
            Err(StorageError::InvalidBucketName { reason, .. }) => assert!(reason.contains("3 and 63")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cors_policy_by_environment() {
        let dev = dev_policy();
        assert_eq!(dev.allowed_origins, vec!["*"]);
        assert!(dev.allowed_methods.contains(&"PUT".to_string()));
        assert!(dev.allowed_methods.contains(&"HEAD".to_string()));

        let origins = vec!["http://localhost:3000".to_string()];
        let prod = CorsPolicy::for_environment(Environment::Production, &origins, Some("https://files.example.com"));
        assert_eq!(prod.allowed_origins, vec!["http://localhost:3000", "https://files.example.com"]);
        assert!(!prod.allowed_origins.contains(&"*".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_bucket_is_idempotent() {
        let storage = MemoryStorage::new();

        let first = ensure_bucket(&storage, "team-files", &dev_policy()).await;
        let first = tokio_test::assert_ok!(first);
        assert!(first.created);
        assert!(first.cors_configured);

        let second = ensure_bucket(&storage, "team-files", &dev_policy()).await;
        let second = tokio_test::assert_ok!(second);
        assert!(!second.created);
        assert!(second.message.contains("already exists"));

        assert_eq!(storage.create_bucket_calls(), 1);
    }

    #[tokio::test]
    async fn test_ensure_bucket_rejects_invalid_name_before_any_call() {
        let storage = MemoryStorage::new();
        let result = ensure_bucket(&storage, "Bad_Name", &dev_policy()).await;
        assert!(matches!(result, Err(StorageError::InvalidBucketName { .. })));
        assert_eq!(storage.create_bucket_calls(), 0);
    }

    #[tokio::test]
    async fn test_cors_failure_is_only_a_warning() {
        let storage = MemoryStorage::new();
        storage.fail_cors(true);

        let setup = tokio_test::assert_ok!(ensure_bucket(&storage, "team-files", &dev_policy()).await);
        assert!(setup.created);
        assert!(!setup.cors_configured);
        assert!(setup.message.contains("Warning"));
        assert!(storage.bucket_exists("team-files").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_bucket_stores_cors_rule() {
        let storage = MemoryStorage::new();
        ensure_bucket(&storage, "team-files", &dev_policy()).await.unwrap();
        assert_eq!(storage.cors_policy("team-files"), Some(dev_policy()));
    }
}
