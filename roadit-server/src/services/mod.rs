//! External service gateways
//!
//! Two boundaries, each a trait so handlers and tests never depend on a
//! concrete HTTP client:
//! - [`AssessmentGateway`]: photo → {issue type, severity}
//! - [`MunicipalityResolver`]: coordinates → municipality name
//!
//! Calls are never retried. Failures carry a [`GatewayError`] whose
//! `user_message()` is safe to show; raw provider text stays in the logs.

pub mod data_uri;
pub mod gemini_client;
pub mod geocoding_client;

pub use data_uri::PhotoDataUri;
pub use gemini_client::GeminiAssessor;
pub use geocoding_client::GeocodingResolver;

use async_trait::async_trait;
use roadit_common::{IssueType, Location, Severity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::GatewayConfig;

/// Gateway failure
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),

    /// Rejected before any network traffic
    #[error("{0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Message for end users; never includes provider response text
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::MissingApiKey(_) => {
                "This service is not configured on the server.".to_string()
            }
            GatewayError::InvalidInput(msg) => msg.clone(),
            GatewayError::Timeout => {
                "The external service took too long to respond. Please try again.".to_string()
            }
            GatewayError::Parse(_) => {
                "The external service did not return a valid answer. Please try again.".to_string()
            }
            GatewayError::Network(_) | GatewayError::Api(_) => {
                "An external service error occurred. Please try again.".to_string()
            }
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Classification of a road photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "issueType")]
    pub issue_type: IssueType,
    #[serde(rename = "suggestedSeverity")]
    pub severity: Severity,
}

/// Image in, {issue type, severity} out
#[async_trait]
pub trait AssessmentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn assess(&self, photo: &PhotoDataUri) -> Result<Assessment, GatewayError>;
}

/// Coordinates in, municipality name out
#[async_trait]
pub trait MunicipalityResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, location: Location) -> Result<String, GatewayError>;
}

/// Validate `photo_data_uri` and ask `gateway` to classify it
pub async fn assess_photo(
    gateway: &dyn AssessmentGateway,
    photo_data_uri: &str,
) -> Result<Assessment, GatewayError> {
    let photo = PhotoDataUri::parse(photo_data_uri)?;
    gateway.assess(&photo).await
}

/// Validate coordinates and ask `resolver` for the municipality name
pub async fn find_municipality(
    resolver: &dyn MunicipalityResolver,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<String, GatewayError> {
    let location = match (lat, lng) {
        (Some(lat), Some(lng)) => Location::new(lat, lng),
        _ => return Err(GatewayError::InvalidInput("Invalid location.".to_string())),
    };
    if !location.is_valid() {
        return Err(GatewayError::InvalidInput("Invalid location.".to_string()));
    }
    resolver.resolve(location).await
}

/// Stand-in used when a gateway has no API key
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured {
    service: &'static str,
}

impl Unconfigured {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AssessmentGateway for Unconfigured {
    fn name(&self) -> &'static str {
        self.service
    }

    async fn assess(&self, _photo: &PhotoDataUri) -> Result<Assessment, GatewayError> {
        Err(GatewayError::MissingApiKey(self.service))
    }
}

#[async_trait]
impl MunicipalityResolver for Unconfigured {
    fn name(&self) -> &'static str {
        self.service
    }

    async fn resolve(&self, _location: Location) -> Result<String, GatewayError> {
        Err(GatewayError::MissingApiKey(self.service))
    }
}

/// Production assessment gateway, or [`Unconfigured`] without a key
pub fn assessment_gateway(config: &GatewayConfig) -> Result<Arc<dyn AssessmentGateway>, GatewayError> {
    match &config.gemini_api_key {
        Some(key) => Ok(Arc::new(GeminiAssessor::new(
            key.clone(),
            config.assessment_model.clone(),
            config.request_timeout,
        )?)),
        None => {
            warn!("Gemini API key not configured; photo assessment is disabled");
            Ok(Arc::new(Unconfigured::new("Gemini")))
        }
    }
}

/// Production municipality resolver, or [`Unconfigured`] without a key
pub fn municipality_resolver(
    config: &GatewayConfig,
) -> Result<Arc<dyn MunicipalityResolver>, GatewayError> {
    match &config.maps_api_key {
        Some(key) => Ok(Arc::new(GeocodingResolver::new(
            key.clone(),
            config.request_timeout,
        )?)),
        None => {
            warn!("Maps API key not configured; municipality lookup is disabled");
            Ok(Arc::new(Unconfigured::new("Maps")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resolver that counts calls and echoes a fixed name
    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MunicipalityResolver for CountingResolver {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn resolve(&self, _location: Location) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("New Delhi".to_string())
        }
    }

    #[tokio::test]
    async fn test_find_municipality_rejects_bad_coordinates_without_calling() {
        let resolver = CountingResolver {
            calls: AtomicUsize::new(0),
        };

        for (lat, lng) in [(None, Some(1.0)), (Some(91.0), Some(0.0)), (Some(0.0), Some(-181.0))] {
            let err = find_municipality(&resolver, lat, lng).await.unwrap_err();
            assert_eq!(err.user_message(), "Invalid location.");
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

        let name = find_municipality(&resolver, Some(28.6), Some(77.2)).await.unwrap();
        assert_eq!(name, "New Delhi");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_reports_missing_key() {
        let gateway = Unconfigured::new("Gemini");
        let err = assess_photo(&gateway, "data:image/png;base64,aGVsbG8=")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingApiKey("Gemini")));
    }

    #[test]
    fn test_user_message_hides_provider_text() {
        let err = GatewayError::Api("403 PERMISSION_DENIED: key abc123 revoked".to_string());
        assert!(!err.user_message().contains("abc123"));
        let err = GatewayError::Parse("expected value at line 1".to_string());
        assert!(!err.user_message().contains("line 1"));
    }

    #[test]
    fn test_assessment_uses_wire_field_names() {
        let assessment: Assessment =
            serde_json::from_str(r#"{"suggestedSeverity":"Severe/Hazardous","issueType":"Broken Road"}"#)
                .unwrap();
        assert_eq!(assessment.severity, Severity::SevereHazardous);
        assert_eq!(assessment.issue_type, IssueType::BrokenRoad);
    }

    #[test]
    fn test_missing_keys_give_unconfigured_gateways() {
        let config = GatewayConfig::default();
        assert_eq!(assessment_gateway(&config).unwrap().name(), "Gemini");
        assert_eq!(municipality_resolver(&config).unwrap().name(), "Maps");
    }
}
