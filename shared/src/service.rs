//! Client for the remote prediction service.
//!
//! Every call goes out through the [`Http`] capability with the same JSON
//! headers and timeout, and every failure comes back as a [`ServiceError`]
//! whose message is ready to show to the user. Nothing is retried here;
//! retrying is a user action handled by the app.

use std::fmt::Display;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::capabilities::{
    Http, HttpError, HttpMethod, HttpRequest, HttpResult, JSON_CONTENT_TYPE,
};
use crate::config::ServiceConfig;
use crate::model::{PredictionResult, SymptomName};

pub const API_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Symptoms,
    Diseases,
    Predict,
}

impl Endpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Health => "/health",
            Self::Symptoms => "/symptoms",
            Self::Diseases => "/diseases",
            Self::Predict => "/predict",
        }
    }

    #[must_use]
    pub const fn method(self) -> HttpMethod {
        match self {
            Self::Predict => HttpMethod::Post,
            Self::Health | Self::Symptoms | Self::Diseases => HttpMethod::Get,
        }
    }

    #[must_use]
    pub const fn failure_prefix(self) -> &'static str {
        match self {
            Self::Health => "Health check failed",
            Self::Symptoms => "Failed to fetch symptoms",
            Self::Diseases => "Failed to fetch diseases",
            Self::Predict => "Prediction failed",
        }
    }
}

/// The single error kind the app sees from the service. The message is
/// shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn wrap(endpoint: Endpoint, underlying: impl Display) -> Self {
        Self::new(format!("{}: {underlying}", endpoint.failure_prefix()))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct SymptomsPayload {
    symptoms: Vec<SymptomName>,
}

#[derive(Deserialize)]
struct DiseasesPayload {
    diseases: Vec<String>,
}

#[derive(Serialize)]
struct PredictPayload<'a> {
    symptoms: &'a [SymptomName],
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceClient {
    config: ServiceConfig,
}

impl ServiceClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Builds the bodiless request for `endpoint` with the shared headers
    /// and timeout applied.
    pub fn request(&self, endpoint: Endpoint) -> Result<HttpRequest, HttpError> {
        let url = self.config.endpoint(endpoint.path())?;
        HttpRequest::new(endpoint.method(), url)
            .with_header("Content-Type", JSON_CONTENT_TYPE)?
            .with_timeout_ms(API_TIMEOUT_MS)
    }

    pub fn predict_request(&self, symptoms: &[SymptomName]) -> Result<HttpRequest, HttpError> {
        self.request(Endpoint::Predict)?
            .with_json(&PredictPayload { symptoms })
    }

    pub fn check_health<Ev, F>(&self, http: &Http<Ev>, callback: F)
    where
        Ev: 'static,
        F: FnOnce(Result<HealthStatus, ServiceError>) -> Ev + Send + 'static,
    {
        http.send(self.request(Endpoint::Health), move |result| {
            callback(decode_health(result))
        });
    }

    pub fn get_symptoms<Ev, F>(&self, http: &Http<Ev>, callback: F)
    where
        Ev: 'static,
        F: FnOnce(Result<Vec<SymptomName>, ServiceError>) -> Ev + Send + 'static,
    {
        http.send(self.request(Endpoint::Symptoms), move |result| {
            callback(decode_symptoms(result))
        });
    }

    pub fn get_diseases<Ev, F>(&self, http: &Http<Ev>, callback: F)
    where
        Ev: 'static,
        F: FnOnce(Result<Vec<String>, ServiceError>) -> Ev + Send + 'static,
    {
        http.send(self.request(Endpoint::Diseases), move |result| {
            callback(decode_diseases(result))
        });
    }

    pub fn predict_disease<Ev, F>(&self, http: &Http<Ev>, symptoms: &[SymptomName], callback: F)
    where
        Ev: 'static,
        F: FnOnce(Result<PredictionResult, ServiceError>) -> Ev + Send + 'static,
    {
        http.send(self.predict_request(symptoms), move |result| {
            callback(decode_prediction(result))
        });
    }
}

pub fn decode_health(result: HttpResult) -> Result<HealthStatus, ServiceError> {
    decode(Endpoint::Health, result)
}

pub fn decode_symptoms(result: HttpResult) -> Result<Vec<SymptomName>, ServiceError> {
    decode::<SymptomsPayload>(Endpoint::Symptoms, result).map(|payload| payload.symptoms)
}

pub fn decode_diseases(result: HttpResult) -> Result<Vec<String>, ServiceError> {
    decode::<DiseasesPayload>(Endpoint::Diseases, result).map(|payload| payload.diseases)
}

/// Like the other decoders, except that a failed response carrying a
/// non-empty `error` field surfaces that text verbatim.
pub fn decode_prediction(result: HttpResult) -> Result<PredictionResult, ServiceError> {
    if let Ok(response) = &result {
        if !response.is_success() {
            if let Ok(body) = response.json::<ApiErrorBody>() {
                if !body.error.is_empty() {
                    warn!(status = response.status(), error = %body.error, "prediction rejected");
                    return Err(ServiceError::new(body.error));
                }
            }
        }
    }
    decode(Endpoint::Predict, result)
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, result: HttpResult) -> Result<T, ServiceError> {
    let outcome = result
        .map_err(|e| ServiceError::wrap(endpoint, e))
        .and_then(|response| {
            if response.is_success() {
                response
                    .json::<T>()
                    .map_err(|e| ServiceError::wrap(endpoint, e))
            } else {
                Err(ServiceError::wrap(
                    endpoint,
                    format!("Request failed with status code {}", response.status()),
                ))
            }
        });

    match &outcome {
        Ok(_) => debug!(endpoint = endpoint.path(), "service call succeeded"),
        Err(e) => warn!(endpoint = endpoint.path(), error = %e, "service call failed"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{HttpHeaders, HttpResponse};
    use serde_json::json;

    fn client() -> ServiceClient {
        ServiceClient::new(ServiceConfig::new("http://api.test:5000").unwrap())
    }

    fn respond(status: u16, body: serde_json::Value) -> HttpResult {
        Ok(HttpResponse::json_body(status, &body).unwrap())
    }

    fn symptoms(names: &[&str]) -> Vec<SymptomName> {
        names.iter().map(|n| SymptomName::new(*n)).collect()
    }

    #[test]
    fn test_requests_share_headers_and_timeout() {
        for endpoint in [
            Endpoint::Health,
            Endpoint::Symptoms,
            Endpoint::Diseases,
            Endpoint::Predict,
        ] {
            let request = client().request(endpoint).unwrap();
            assert_eq!(request.method(), endpoint.method());
            assert_eq!(
                request.url().as_str(),
                format!("http://api.test:5000{}", endpoint.path())
            );
            assert_eq!(request.headers().get("Content-Type"), Some("application/json"));
            assert_eq!(request.timeout_ms(), API_TIMEOUT_MS);
        }
    }

    #[test]
    fn test_predict_request_body() {
        let request = client()
            .predict_request(&symptoms(&["high_fever", "cough"]))
            .unwrap();
        assert_eq!(request.method(), HttpMethod::Post);
        let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
        assert_eq!(body, json!({"symptoms": ["high_fever", "cough"]}));
    }

    #[test]
    fn test_health_success() {
        let status = decode_health(respond(
            200,
            json!({"status": "healthy", "message": "ML Disease Prediction API is running"}),
        ))
        .unwrap();
        assert_eq!(status.status, "healthy");
    }

    #[test]
    fn test_health_transport_failure() {
        let err = decode_health(Err(HttpError::Connection {
            message: "Network Error".into(),
        }))
        .unwrap_err();
        assert_eq!(err.message(), "Health check failed: Network Error");
    }

    #[test]
    fn test_health_timeout() {
        let err = decode_health(Err(HttpError::Timeout {
            timeout_ms: API_TIMEOUT_MS,
        }))
        .unwrap_err();
        assert_eq!(err.message(), "Health check failed: timeout of 10000ms exceeded");
    }

    #[test]
    fn test_health_server_error_status() {
        let err = decode_health(respond(503, json!({"error": "down"}))).unwrap_err();
        assert_eq!(
            err.message(),
            "Health check failed: Request failed with status code 503"
        );
    }

    #[test]
    fn test_symptoms_success_and_failure() {
        let list = decode_symptoms(respond(
            200,
            json!({"symptoms": ["fever", "cough"], "count": 2}),
        ))
        .unwrap();
        assert_eq!(list, symptoms(&["fever", "cough"]));

        let err = decode_symptoms(respond(500, json!({"error": "Failed to retrieve symptoms"})))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Failed to fetch symptoms: Request failed with status code 500"
        );
    }

    #[test]
    fn test_symptoms_malformed_body() {
        let err = decode_symptoms(respond(200, json!({"items": []}))).unwrap_err();
        assert!(err.message().starts_with("Failed to fetch symptoms: invalid response:"));
    }

    #[test]
    fn test_diseases() {
        let list = decode_diseases(respond(200, json!({"diseases": ["Malaria", "Typhoid"]})))
            .unwrap();
        assert_eq!(list, vec!["Malaria".to_string(), "Typhoid".to_string()]);

        let err = decode_diseases(Err(HttpError::Connection {
            message: "Network Error".into(),
        }))
        .unwrap_err();
        assert_eq!(err.message(), "Failed to fetch diseases: Network Error");
    }

    #[test]
    fn test_prediction_success_is_unmodified() {
        let result = decode_prediction(respond(
            200,
            json!({
                "disease": "Common Cold",
                "description": "A viral infection",
                "precautions": ["Rest"]
            }),
        ))
        .unwrap();
        assert_eq!(
            result,
            PredictionResult {
                disease: "Common Cold".into(),
                description: Some("A viral infection".into()),
                precautions: Some(vec!["Rest".into()]),
            }
        );
    }

    #[test]
    fn test_prediction_optional_fields_absent() {
        let result = decode_prediction(respond(200, json!({"disease": "Migraine"}))).unwrap();
        assert_eq!(result.description, None);
        assert_eq!(result.precautions, None);
    }

    #[test]
    fn test_prediction_structured_error_is_verbatim() {
        let err = decode_prediction(respond(
            400,
            json!({"error": "Invalid input", "message": "Unknown symptom: foo"}),
        ))
        .unwrap_err();
        assert_eq!(err.message(), "Invalid input");
    }

    #[test]
    fn test_prediction_unstructured_error_is_prefixed() {
        let response = HttpResponse::new(502, HttpHeaders::new(), b"Bad Gateway".to_vec());
        let err = decode_prediction(Ok(response)).unwrap_err();
        assert_eq!(
            err.message(),
            "Prediction failed: Request failed with status code 502"
        );

        let err = decode_prediction(respond(500, json!({"error": ""}))).unwrap_err();
        assert_eq!(
            err.message(),
            "Prediction failed: Request failed with status code 500"
        );
    }

    #[test]
    fn test_prediction_transport_failure() {
        let err = decode_prediction(Err(HttpError::Timeout {
            timeout_ms: API_TIMEOUT_MS,
        }))
        .unwrap_err();
        assert_eq!(err.message(), "Prediction failed: timeout of 10000ms exceeded");
    }

    #[test]
    fn test_error_display_is_message() {
        let err = ServiceError::new("Invalid input");
        assert_eq!(err.to_string(), "Invalid input");
    }
}
