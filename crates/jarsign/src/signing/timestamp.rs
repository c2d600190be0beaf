use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use cms::content_info::ContentInfo;
use der::asn1::{BitString, OctetString};
use der::{Decode, Encode, Sequence};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use spki::AlgorithmIdentifierOwned;
use tracing::debug;

use super::pkcs7::{ID_SIGNED_DATA, digest_algorithm_identifier};
use crate::request::DigestAlgorithm;

const QUERY_CONTENT_TYPE: &str = "application/timestamp-query";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// PKIStatus values that carry a token.
const GRANTED: u8 = 0;
const GRANTED_WITH_MODS: u8 = 1;

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct MessageImprint {
    hash_algorithm: AlgorithmIdentifierOwned,
    hashed_message: OctetString,
}

/// RFC 3161 `TimeStampReq` without a policy or extensions.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct TimeStampReq {
    version: u8,
    message_imprint: MessageImprint,
    nonce: u64,
    cert_req: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct PkiStatusInfo {
    status: u8,
    status_string: Option<Vec<String>>,
    fail_info: Option<BitString>,
}

#[derive(Clone, Debug, Sequence)]
struct TimeStampResp {
    status: PkiStatusInfo,
    time_stamp_token: Option<ContentInfo>,
}

/// Source of RFC 3161 timestamp tokens.
pub trait TimestampAuthority: Send + Sync {
    /// Returns a DER `TimeStampToken` over `digest(signature)`.
    fn timestamp(&self, url: &str, digest: DigestAlgorithm, signature: &[u8]) -> Result<Vec<u8>>;
}

/// Talks RFC 3161 over HTTP or HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTimestampAuthority {
    timeout: Duration,
}

impl Default for HttpTimestampAuthority {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpTimestampAuthority {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn exchange(&self, url: &str, query: Vec<u8>) -> Result<Bytes> {
        let uri: Uri = url
            .parse()
            .with_context(|| format!("invalid timestamp URL {url}"))?;
        if !matches!(uri.scheme_str(), Some("http" | "https")) {
            bail!("timestamp URL {url} is neither http nor https");
        }
        let client: Client<HttpsConnector<HttpConnector>, Full<Bytes>> =
            Client::builder(TokioExecutor::new()).build(HttpsConnector::new());
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, QUERY_CONTENT_TYPE)
            .body(Full::new(Bytes::from(query)))
            .context("building timestamp request")?;

        let response = tokio::time::timeout(self.timeout, client.request(request))
            .await
            .with_context(|| format!("no answer from {url} within {:?}", self.timeout))?
            .with_context(|| format!("sending timestamp request to {url}"))?;

        if response.status() != StatusCode::OK {
            bail!("{url} answered with HTTP {}", response.status());
        }
        let body = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .with_context(|| format!("timestamp response from {url} timed out"))?
            .context("reading timestamp response")?;
        Ok(body.to_bytes())
    }
}

impl TimestampAuthority for HttpTimestampAuthority {
    fn timestamp(&self, url: &str, digest: DigestAlgorithm, signature: &[u8]) -> Result<Vec<u8>> {
        let query = timestamp_request(digest, signature, nonce())
            .context("encoding timestamp request")?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("starting timestamp runtime")?;
        let body = runtime.block_on(self.exchange(url, query))?;
        debug!(url, bytes = body.len(), "timestamp response received");

        parse_timestamp_response(&body)
    }
}

fn nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

/// DER `TimeStampReq` asking for the TSA certificate to be included.
fn timestamp_request(digest: DigestAlgorithm, signature: &[u8], nonce: u64) -> der::Result<Vec<u8>> {
    TimeStampReq {
        version: 1,
        message_imprint: MessageImprint {
            hash_algorithm: digest_algorithm_identifier(digest),
            hashed_message: OctetString::new(digest.digest(signature))?,
        },
        nonce,
        cert_req: true,
    }
    .to_der()
}

/// Pulls the token out of a DER `TimeStampResp`.
fn parse_timestamp_response(body: &[u8]) -> Result<Vec<u8>> {
    let response = TimeStampResp::from_der(body).context("malformed timestamp response")?;
    let status = response.status.status;
    if status != GRANTED && status != GRANTED_WITH_MODS {
        let reason = response
            .status
            .status_string
            .map(|text| format!(": {}", text.join("; ")))
            .unwrap_or_default();
        bail!("timestamp request rejected with status {status}{reason}");
    }
    let token = response
        .time_stamp_token
        .context("timestamp response carries no token")?;
    if token.content_type != ID_SIGNED_DATA {
        bail!("timestamp token is not SignedData but {}", token.content_type);
    }
    token.to_der().context("re-encoding timestamp token")
}
