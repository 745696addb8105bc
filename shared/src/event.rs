use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::model::{Page, PredictionResult, RequestToken, RowId, SymptomName};
use crate::service::{HealthStatus, ServiceError};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Shell setup & navigation
    Configure(ServiceConfig),
    Navigate(Page),

    // Connection
    RetryRequested,

    // Form editing
    SymptomChanged { row: RowId, name: String },
    RowAdded,
    RowRemoved { row: RowId },

    // Submission & result
    SubmitRequested,
    ResultDismissed,
    NewPredictionRequested,

    // Landing page
    DiseaseCatalogRequested,

    // Service responses, never sent by the shell
    #[serde(skip)]
    HealthChecked {
        token: RequestToken,
        result: Result<HealthStatus, ServiceError>,
    },
    #[serde(skip)]
    SymptomsLoaded {
        token: RequestToken,
        result: Result<Vec<SymptomName>, ServiceError>,
    },
    #[serde(skip)]
    PredictionResolved {
        token: RequestToken,
        result: Result<PredictionResult, ServiceError>,
    },
    #[serde(skip)]
    DiseaseCatalogLoaded(Result<Vec<String>, ServiceError>),
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::Navigate(_) => "navigate",
            Self::RetryRequested => "retry_requested",
            Self::SymptomChanged { .. } => "symptom_changed",
            Self::RowAdded => "row_added",
            Self::RowRemoved { .. } => "row_removed",
            Self::SubmitRequested => "submit_requested",
            Self::ResultDismissed => "result_dismissed",
            Self::NewPredictionRequested => "new_prediction_requested",
            Self::DiseaseCatalogRequested => "disease_catalog_requested",
            Self::HealthChecked { .. } => "health_checked",
            Self::SymptomsLoaded { .. } => "symptoms_loaded",
            Self::PredictionResolved { .. } => "prediction_resolved",
            Self::DiseaseCatalogLoaded(_) => "disease_catalog_loaded",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Configure(_)
                | Self::HealthChecked { .. }
                | Self::SymptomsLoaded { .. }
                | Self::PredictionResolved { .. }
                | Self::DiseaseCatalogLoaded(_)
        )
    }
}
