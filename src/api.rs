use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.groundlight.ai/device-api";
const API_TOKEN_HEADER: &str = "x-api-token";
#[cfg(test)]
pub(crate) const STUB_TOKEN: &str = "api_stub_token";
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Errors that can occur while talking to the Groundlight service.
#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    UnexpectedStatus { status: StatusCode, body: String },
    InvalidUrl(url::ParseError),
    DetectorMismatch {
        name: String,
        expected: String,
        found: String,
    },
    AmbiguousDetector { name: String, count: usize },
    InvalidImage(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(err) => write!(f, "http error: {err}"),
            ApiError::UnexpectedStatus { status, body } => {
                write!(f, "unexpected status {status}: {body}")
            }
            ApiError::InvalidUrl(err) => write!(f, "invalid API url: {err}"),
            ApiError::DetectorMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "detector `{name}` already exists with query `{found}` (wanted `{expected}`)"
            ),
            ApiError::AmbiguousDetector { name, count } => {
                write!(f, "{count} detectors share the name `{name}`")
            }
            ApiError::InvalidImage(err) => write!(f, "invalid image: {err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Http(value)
    }
}

impl From<url::ParseError> for ApiError {
    fn from(value: url::ParseError) -> Self {
        ApiError::InvalidUrl(value)
    }
}

/// Whether the service should route a query to human reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HumanReview {
    #[default]
    Default,
    Always,
    Never,
}

impl HumanReview {
    pub fn as_str(&self) -> &'static str {
        match self {
            HumanReview::Default => "DEFAULT",
            HumanReview::Always => "ALWAYS",
            HumanReview::Never => "NEVER",
        }
    }
}

/// A detector as stored by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Detector {
    pub id: String,
    pub name: String,
    pub query: String,
    pub confidence_threshold: f64,
    #[serde(default)]
    pub patience_time: Option<f64>,
}

/// Body of `POST /v1/detectors`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectorCreation<'a> {
    pub name: &'a str,
    pub query: &'a str,
    pub confidence_threshold: f64,
}

#[derive(Debug, Deserialize)]
struct DetectorPage {
    count: usize,
    #[serde(default)]
    results: Vec<Detector>,
}

/// Label and confidence attached to an image query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResult {
    pub label: String,
    /// `null` when the label was supplied by a human reviewer.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageQuery {
    pub id: String,
    pub detector_id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<QueryResult>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
}

/// Query parameters sent alongside an image submission.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionParams {
    pub patience_time: f64,
    pub confidence_threshold: f64,
    pub human_review: HumanReview,
}

/// Image MIME types accepted by the image-query endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("png") {
            Some(ImageFormat::Png)
        } else if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
            Some(ImageFormat::Jpeg)
        } else if ext.eq_ignore_ascii_case("gif") {
            Some(ImageFormat::Gif)
        } else if ext.eq_ignore_ascii_case("webp") {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }
}

/// Blocking client for the Groundlight device API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    api_token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_builder(base_url.into(), api_token.into(), Client::builder())
    }

    /// Talks to a loopback stub directly, ignoring any proxy in the environment.
    #[cfg(test)]
    pub(crate) fn for_stub(base_url: &str) -> Self {
        Self::with_builder(
            base_url.to_string(),
            STUB_TOKEN.to_string(),
            Client::builder().no_proxy(),
        )
        .expect("stub client")
    }

    fn with_builder(
        base_url: String,
        api_token: String,
        builder: reqwest::blocking::ClientBuilder,
    ) -> Result<Self, ApiError> {
        let http = builder
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            api_token,
        })
    }

    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Looks up a detector by its exact name.
    pub fn get_detector_by_name(&self, name: &str) -> Result<Option<Detector>, ApiError> {
        let mut url = self.endpoint("v1/detectors")?;
        url.query_pairs_mut().append_pair("name", name);

        let response = self.authorized(self.http.get(url)).send()?;
        let page: DetectorPage = Self::parse_json(response)?;

        match page.count {
            0 => Ok(None),
            1 => Ok(page.results.into_iter().next()),
            count => Err(ApiError::AmbiguousDetector {
                name: name.to_string(),
                count,
            }),
        }
    }

    pub fn create_detector(&self, creation: &DetectorCreation<'_>) -> Result<Detector, ApiError> {
        let url = self.endpoint("v1/detectors")?;
        let response = self.authorized(self.http.post(url).json(creation)).send()?;
        Self::parse_json(response)
    }

    /// Fetches the named detector, creating it when it does not exist yet.
    /// An existing detector with a different query is rejected.
    pub fn get_or_create_detector(
        &self,
        creation: &DetectorCreation<'_>,
    ) -> Result<Detector, ApiError> {
        match self.get_detector_by_name(creation.name)? {
            Some(existing) if existing.query != creation.query => {
                Err(ApiError::DetectorMismatch {
                    name: creation.name.to_string(),
                    expected: creation.query.to_string(),
                    found: existing.query,
                })
            }
            Some(existing) => Ok(existing),
            None => {
                log::info!("Creating detector `{}`", creation.name);
                self.create_detector(creation)
            }
        }
    }

    /// Uploads one encoded image to `/v1/image-queries`.
    pub fn submit_image_query(
        &self,
        detector_id: &str,
        bytes: Vec<u8>,
        format: ImageFormat,
        params: &SubmissionParams,
    ) -> Result<ImageQuery, ApiError> {
        let url = self.image_query_url(detector_id, params)?;
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, format.mime_type())
            .body(bytes);
        let response = self.authorized(request).send()?;
        Self::parse_json(response)
    }

    pub fn get_image_query(&self, id: &str) -> Result<ImageQuery, ApiError> {
        let url = self.endpoint(&format!("v1/image-queries/{id}"))?;
        let response = self.authorized(self.http.get(url)).send()?;
        Self::parse_json(response)
    }

    fn image_query_url(&self, detector_id: &str, params: &SubmissionParams) -> Result<Url, ApiError> {
        let mut url = self.endpoint("v1/image-queries")?;
        url.query_pairs_mut()
            .append_pair("detector_id", detector_id)
            .append_pair("patience_time", &params.patience_time.to_string())
            .append_pair(
                "confidence_threshold",
                &params.confidence_threshold.to_string(),
            )
            .append_pair("human_review", params.human_review.as_str());
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Url::parse(&format!("{}/{}", self.base_url, path)).map_err(ApiError::from)
    }

    fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if response.status().is_success() {
            response.json().map_err(ApiError::from)
        } else {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            Err(ApiError::UnexpectedStatus { status, body })
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_TOKEN_HEADER, &self.api_token)
    }
}
