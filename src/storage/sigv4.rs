//! AWS Signature Version 4 for the bucket subresource calls rust-s3 cannot
//! send (`PUT /{bucket}?cors`).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub(crate) struct SigningParams<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub time: DateTime<Utc>,
}

/// One request to sign. `path` and `query` must already be in canonical form.
pub(crate) struct UnsignedRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub headers: Vec<(String, String)>,
    pub payload: &'a [u8],
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| StorageError::Credentials(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> StorageResult<Vec<u8>> {
    let k_date = hmac(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

/// Returns every header to send, `authorization` included, sorted by name.
pub(crate) fn sign(params: &SigningParams<'_>, request: UnsignedRequest<'_>) -> StorageResult<Vec<(String, String)>> {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let short_date = params.time.format("%Y%m%d").to_string();
    let payload_hash = sha256_hex(request.payload);

    let mut headers: Vec<(String, String)> = request
        .headers
        .into_iter()
        .map(|(name, value)| (name.to_lowercase(), value.trim().to_string()))
        .collect();
    headers.push(("host".to_string(), request.host.to_string()));
    headers.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
    headers.push(("x-amz-date".to_string(), amz_date.clone()));
    if let Some(token) = params.session_token {
        headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method, request.path, request.query, canonical_headers, signed_headers, payload_hash
    );

    let scope = format!("{}/{}/s3/aws4_request", short_date, params.region);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(params.secret_key, &short_date, params.region, "s3")?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    headers.push((
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, params.access_key, scope, signed_headers, signature
        ),
    ));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signing_key_matches_aws_example() {
        // Published derivation example for the IAM service.
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_empty_payload_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sign_produces_sorted_signed_headers() {
        let params = SigningParams {
            access_key: "AKIDEXAMPLE",
            secret_key: "secret",
            session_token: None,
            region: "auto",
            time: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        };
        let headers = sign(
            &params,
            UnsignedRequest {
                method: "PUT",
                host: "localhost:9000",
                path: "/team-files",
                query: "cors=",
                headers: vec![("Content-MD5".to_string(), "abc==".to_string())],
                payload: b"<CORSConfiguration/>",
            },
        )
        .unwrap();

        let names: Vec<&str> = headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["content-md5", "host", "x-amz-content-sha256", "x-amz-date", "authorization"]
        );
        let auth = &headers.last().unwrap().1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20250102/auto/s3/aws4_request, \
             SignedHeaders=content-md5;host;x-amz-content-sha256;x-amz-date, Signature="
        ));
        assert_eq!(headers[3].1, "20250102T030405Z");
    }
}
