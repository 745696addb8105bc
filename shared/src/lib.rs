// lib.rs - Disease prediction form core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod config;
pub mod event;
pub mod model;
pub mod service;

#[cfg(feature = "native")]
pub mod shell;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ServiceConfig;
pub use event::Event;
pub use model::{
    CatalogState, ConnectionState, Model, Page, PredictionResult, RequestToken, RowId,
    SubmissionState, SymptomName, SymptomRow, SymptomRows,
};
pub use service::{ServiceClient, ServiceError};

pub const NO_SYMPTOMS_MESSAGE: &str = "Please select at least one symptom.";
pub const CONNECTING_MESSAGE: &str = "Connecting to prediction service...";
pub const SERVICE_UNAVAILABLE_TITLE: &str = "Service Unavailable";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "Unable to connect to the prediction service. Please try again later.";
pub const RETRY_LABEL: &str = "Retry Connection";
pub const SYMPTOM_PLACEHOLDER: &str = "Select a symptom...";
pub const SUBMIT_LABEL: &str = "Predict Disease";
pub const SUBMITTING_LABEL: &str = "Analyzing...";
pub const DISCLAIMER: &str = "This prediction is for informational purposes only. \
    Please consult with a healthcare professional for proper medical advice.";

/// `high_grade_fever` -> `High Grade Fever`.
#[must_use]
pub fn format_symptom_name(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomOption {
    pub value: String,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowView {
    pub id: u32,
    pub label: String,
    pub selected: Option<String>,
    pub selected_label: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultView {
    pub disease: String,
    pub description: Option<String>,
    pub precautions: Vec<String>,
    pub disclaimer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormView {
    pub rows: Vec<RowView>,
    pub options: Vec<SymptomOption>,
    pub placeholder: String,
    pub can_remove_rows: bool,
    pub is_loading_symptoms: bool,
    pub is_submitting: bool,
    pub submit_label: String,
    pub error: Option<String>,
    pub result: Option<ResultView>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogView {
    pub is_loading: bool,
    pub diseases: Vec<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageView {
    Landing {
        catalog: CatalogView,
    },
    Connecting {
        message: String,
    },
    Unavailable {
        title: String,
        message: String,
        detail: String,
        retry_label: String,
    },
    Form(FormView),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub page: PageView,
}

pub mod app {
    use super::*;
    use tracing::{debug, info, warn};

    #[derive(Default)]
    pub struct App;

    impl App {
        /// Health check first; the vocabulary is fetched once it passes.
        fn start_connection(model: &mut Model, caps: &Capabilities) {
            let token = model.begin_connection_attempt();
            info!(%token, base_url = model.config.base_url(), "checking prediction service");

            model
                .client()
                .check_health(&caps.http, move |result| Event::HealthChecked { token, result });
        }

        fn submit(model: &mut Model, caps: &Capabilities) {
            if model.page != Page::Form || model.connection != ConnectionState::Connected {
                warn!(connection = ?model.connection, "submit ignored while not connected");
                return;
            }

            model.submission = SubmissionState::Idle;

            let selected = model.rows.selected();
            if selected.is_empty() {
                model.reject_submission(NO_SYMPTOMS_MESSAGE);
                return;
            }

            let token = model.begin_prediction();
            info!(%token, symptoms = selected.len(), "requesting prediction");

            model.client().predict_disease(&caps.http, &selected, move |result| {
                Event::PredictionResolved { token, result }
            });
        }

        fn build_form_view(model: &Model) -> FormView {
            let rows = model
                .rows
                .iter()
                .map(|row| RowView {
                    id: row.id.0,
                    label: format!("Symptom {}", row.id),
                    selected: row.name.as_ref().map(|name| name.as_str().to_string()),
                    selected_label: row.name.as_ref().map(SymptomName::display_name),
                })
                .collect();

            let options = model
                .vocabulary
                .iter()
                .map(|name| SymptomOption {
                    value: name.as_str().to_string(),
                    label: name.display_name(),
                })
                .collect();

            let is_submitting = model.submission.is_loading();

            let (error, result) = match &model.submission {
                SubmissionState::Failed(message) => (Some(message.clone()), None),
                SubmissionState::Succeeded(prediction) => (
                    None,
                    Some(ResultView {
                        disease: prediction.disease.clone(),
                        description: prediction.description.clone(),
                        precautions: prediction.precautions.clone().unwrap_or_default(),
                        disclaimer: DISCLAIMER.to_string(),
                    }),
                ),
                SubmissionState::Idle | SubmissionState::Loading => (None, None),
            };

            FormView {
                rows,
                options,
                placeholder: SYMPTOM_PLACEHOLDER.to_string(),
                can_remove_rows: model.rows.can_remove(),
                is_loading_symptoms: model.is_fetching_vocabulary(),
                is_submitting,
                submit_label: if is_submitting {
                    SUBMITTING_LABEL
                } else {
                    SUBMIT_LABEL
                }
                .to_string(),
                error,
                result,
            }
        }

        fn build_catalog_view(catalog: &CatalogState) -> CatalogView {
            match catalog {
                CatalogState::NotLoaded => CatalogView::default(),
                CatalogState::Loading => CatalogView {
                    is_loading: true,
                    ..CatalogView::default()
                },
                CatalogState::Loaded(diseases) => CatalogView {
                    diseases: diseases.clone(),
                    ..CatalogView::default()
                },
                CatalogState::Failed(message) => CatalogView {
                    error: Some(message.clone()),
                    ..CatalogView::default()
                },
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(
                event = event.name(),
                user_initiated = event.is_user_initiated(),
                "update"
            );

            match event {
                Event::Configure(config) => {
                    info!(base_url = config.base_url(), "service configured");
                    model.config = config;
                }

                Event::Navigate(Page::Form) => {
                    model.page = Page::Form;
                    model.reset_form();
                    Self::start_connection(model, caps);
                    caps.render.render();
                }

                Event::Navigate(Page::Landing) => {
                    model.page = Page::Landing;
                    model.reset_form();
                    caps.render.render();
                }

                Event::RetryRequested => {
                    if model.page == Page::Form
                        && matches!(model.connection, ConnectionState::Disconnected { .. })
                    {
                        Self::start_connection(model, caps);
                        caps.render.render();
                    } else {
                        debug!(connection = ?model.connection, "retry ignored");
                    }
                }

                Event::HealthChecked { token, result } => {
                    if !model.is_current_connection(token) {
                        debug!(%token, "discarding stale health check");
                        return;
                    }

                    match result {
                        Ok(status) => {
                            info!(%token, status = %status.status, "prediction service connected");
                            model.connection = ConnectionState::Connected;
                            model.client().get_symptoms(&caps.http, move |result| {
                                Event::SymptomsLoaded { token, result }
                            });
                        }
                        Err(reason) => {
                            warn!(%token, error = %reason, "prediction service unavailable");
                            model.finish_connection_attempt();
                            model.connection = ConnectionState::Disconnected { reason };
                        }
                    }
                    caps.render.render();
                }

                Event::SymptomsLoaded { token, result } => {
                    if !model.is_current_connection(token) {
                        debug!(%token, "discarding stale symptom list");
                        return;
                    }
                    model.finish_connection_attempt();

                    match result {
                        Ok(vocabulary) => {
                            info!(count = vocabulary.len(), "symptom vocabulary loaded");
                            model.vocabulary = vocabulary;
                        }
                        Err(reason) => {
                            warn!(%token, error = %reason, "symptom vocabulary unavailable");
                            model.connection = ConnectionState::Disconnected { reason };
                        }
                    }
                    caps.render.render();
                }

                Event::SymptomChanged { row, name } => {
                    let name = (!name.is_empty()).then(|| SymptomName::new(name));
                    if !model.rows.set(row, name) {
                        debug!(%row, "symptom change for unknown row ignored");
                    }
                    caps.render.render();
                }

                Event::RowAdded => {
                    let id = model.rows.add();
                    debug!(row = %id, "row added");
                    caps.render.render();
                }

                Event::RowRemoved { row } => {
                    if !model.rows.remove(row) {
                        debug!(%row, rows = model.rows.len(), "row removal ignored");
                    }
                    caps.render.render();
                }

                Event::SubmitRequested => {
                    Self::submit(model, caps);
                    caps.render.render();
                }

                Event::PredictionResolved { token, result } => {
                    if !model.take_prediction(token) {
                        debug!(%token, "discarding stale prediction");
                        return;
                    }

                    model.submission = match result {
                        Ok(prediction) => {
                            info!(%token, disease = %prediction.disease, "prediction received");
                            SubmissionState::Succeeded(prediction)
                        }
                        Err(e) => {
                            warn!(%token, error = %e, "prediction failed");
                            SubmissionState::Failed(e.message().to_string())
                        }
                    };
                    caps.render.render();
                }

                Event::ResultDismissed => {
                    if matches!(model.submission, SubmissionState::Succeeded(_)) {
                        model.submission = SubmissionState::Idle;
                        caps.render.render();
                    }
                }

                Event::NewPredictionRequested => {
                    if matches!(model.submission, SubmissionState::Succeeded(_)) {
                        model.submission = SubmissionState::Idle;
                        model.rows = SymptomRows::new();
                        caps.render.render();
                    }
                }

                Event::DiseaseCatalogRequested => {
                    model.catalog = CatalogState::Loading;
                    model
                        .client()
                        .get_diseases(&caps.http, Event::DiseaseCatalogLoaded);
                    caps.render.render();
                }

                Event::DiseaseCatalogLoaded(result) => {
                    model.catalog = match result {
                        Ok(diseases) => CatalogState::Loaded(diseases),
                        Err(e) => CatalogState::Failed(e.message().to_string()),
                    };
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let page = match model.page {
                Page::Landing => PageView::Landing {
                    catalog: Self::build_catalog_view(&model.catalog),
                },
                Page::Form => match &model.connection {
                    ConnectionState::Checking => PageView::Connecting {
                        message: CONNECTING_MESSAGE.to_string(),
                    },
                    ConnectionState::Disconnected { reason } => PageView::Unavailable {
                        title: SERVICE_UNAVAILABLE_TITLE.to_string(),
                        message: SERVICE_UNAVAILABLE_MESSAGE.to_string(),
                        detail: reason.message().to_string(),
                        retry_label: RETRY_LABEL.to_string(),
                    },
                    ConnectionState::Connected => PageView::Form(Self::build_form_view(model)),
                },
            };

            ViewModel { page }
        }
    }
}
