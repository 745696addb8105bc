//! A headless shell for running the core natively: HTTP effects go out
//! through `reqwest`, renders are counted, and the caller reads the view.

use std::collections::VecDeque;
use std::time::Duration;

use crux_core::Core;
use reqwest::Client;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::capabilities::{
    HttpError, HttpHeaders, HttpMethod, HttpOperation, HttpRequest, HttpResponse, HttpResult,
};
use crate::config::ServiceConfig;
use crate::{App, Capabilities, Effect, Event, ViewModel};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `medico_shared=info`. Does nothing if a subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("medico_shared=info"));

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
}

/// Reads `.env` if present, then the process environment.
pub fn load_config() -> Result<ServiceConfig, HttpError> {
    dotenvy::dotenv().ok();
    ServiceConfig::from_env()
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub struct NativeHttp {
    client: Client,
}

impl NativeHttp {
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| HttpError::InvalidRequest {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    pub async fn execute(&self, request: &HttpRequest) -> HttpResult {
        let url = request.url().as_str();
        let mut builder = match request.method() {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };

        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .timeout(Duration::from_millis(request.timeout_ms()))
            .send()
            .await
            .map_err(|e| transport_error(&e, request.timeout_ms()))?;

        let status = response.status().as_u16();
        let mut headers = HttpHeaders::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            if let Err(e) = headers.insert(name.as_str(), value) {
                debug!(header = name.as_str(), error = %e, "dropping response header");
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e, request.timeout_ms()))?;

        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}

fn transport_error(e: &reqwest::Error, timeout_ms: u64) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout { timeout_ms }
    } else if e.is_connect() {
        HttpError::Connection {
            message: "Network Error".to_string(),
        }
    } else {
        HttpError::Connection {
            message: e.to_string(),
        }
    }
}

/// Drives the core to quiescence after each event.
pub struct NativeShell {
    core: Core<Effect, App>,
    http: NativeHttp,
    renders: usize,
}

impl NativeShell {
    pub fn new(config: ServiceConfig) -> Result<Self, HttpError> {
        let shell = Self {
            core: Core::new::<Capabilities>(),
            http: NativeHttp::new()?,
            renders: 0,
        };
        // Configure never produces effects.
        let effects = shell.core.process_event(Event::Configure(config));
        debug_assert!(effects.is_empty());
        Ok(shell)
    }

    pub async fn dispatch(&mut self, event: Event) -> ViewModel {
        let mut queue: VecDeque<Effect> = self.core.process_event(event).into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Render(_) => self.renders += 1,
                Effect::Http(mut request) => {
                    let HttpOperation::Execute(operation) = &request.operation;
                    let result = self.http.execute(operation).await;
                    if let Err(e) = &result {
                        warn!(url = operation.url().as_str(), error = %e, "request failed");
                    }
                    queue.extend(self.core.resolve(&mut request, result));
                }
            }
        }

        self.core.view()
    }

    pub fn view(&self) -> ViewModel {
        self.core.view()
    }

    pub fn renders(&self) -> usize {
        self.renders
    }
}
