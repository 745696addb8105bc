use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ServiceConfig;
use crate::service::{ServiceClient, ServiceError};

/// A symptom identifier from the server's vocabulary, e.g. `high_fever`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SymptomName(String);

impl SymptomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label; the stored value is left untouched.
    pub fn display_name(&self) -> String {
        crate::format_symptom_name(&self.0)
    }
}

impl fmt::Display for SymptomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RowId(pub u32);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SymptomRow {
    pub id: RowId,
    pub name: Option<SymptomName>,
}

/// The editable symptom selectors, in insertion order.
///
/// Never empty. A new row takes the highest id plus one, counted from a
/// high-water mark so an id removed from the end is not handed out again.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SymptomRows {
    rows: Vec<SymptomRow>,
    next_id: u32,
}

impl Default for SymptomRows {
    fn default() -> Self {
        Self::new()
    }
}

impl SymptomRows {
    pub const FIRST_ID: RowId = RowId(1);

    pub fn new() -> Self {
        Self {
            rows: vec![SymptomRow {
                id: Self::FIRST_ID,
                name: None,
            }],
            next_id: Self::FIRST_ID.0 + 1,
        }
    }

    /// Sets or clears the symptom of row `id`. Returns false if no such row.
    pub fn set(&mut self, id: RowId, name: Option<SymptomName>) -> bool {
        match self.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.name = name;
                true
            }
            None => false,
        }
    }

    pub fn add(&mut self) -> RowId {
        let max = self.rows.iter().map(|row| row.id.0).max().unwrap_or(0);
        let id = RowId(self.next_id.max(max + 1));
        self.next_id = id.0 + 1;
        self.rows.push(SymptomRow { id, name: None });
        id
    }

    /// Removes row `id` unless it is the last one left. Returns whether a
    /// row was removed.
    pub fn remove(&mut self, id: RowId) -> bool {
        if self.rows.len() <= 1 {
            return false;
        }
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    /// The chosen symptoms in row order, skipping empty rows.
    pub fn selected(&self) -> Vec<SymptomName> {
        self.rows
            .iter()
            .filter_map(|row| row.name.as_ref())
            .filter(|name| !name.as_str().is_empty())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymptomRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn can_remove(&self) -> bool {
        self.rows.len() > 1
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PredictionResult {
    pub disease: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precautions: Option<Vec<String>>,
}

#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Checking,
    Connected,
    Disconnected {
        reason: ServiceError,
    },
}

#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Loading,
    Succeeded(PredictionResult),
    Failed(String),
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    #[default]
    Landing,
    Form,
}

#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CatalogState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Vec<String>),
    Failed(String),
}

/// Identifies one outstanding request so a late answer to an older one can
/// be told apart from the answer the app is waiting for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Model {
    pub page: Page,
    pub config: ServiceConfig,

    // Form instance
    pub connection: ConnectionState,
    pub vocabulary: Vec<SymptomName>,
    pub rows: SymptomRows,
    pub submission: SubmissionState,

    // Landing page
    pub catalog: CatalogState,

    issued_tokens: u64,
    pending_connection: Option<RequestToken>,
    pending_prediction: Option<RequestToken>,
}

impl Model {
    pub fn client(&self) -> ServiceClient {
        ServiceClient::new(self.config.clone())
    }

    fn issue_token(&mut self) -> RequestToken {
        self.issued_tokens += 1;
        RequestToken(self.issued_tokens)
    }

    /// Starts a new startup attempt, superseding any attempt in flight.
    pub fn begin_connection_attempt(&mut self) -> RequestToken {
        let token = self.issue_token();
        self.connection = ConnectionState::Checking;
        self.pending_connection = Some(token);
        token
    }

    pub fn is_current_connection(&self, token: RequestToken) -> bool {
        self.pending_connection == Some(token)
    }

    pub fn finish_connection_attempt(&mut self) {
        self.pending_connection = None;
    }

    pub fn is_fetching_vocabulary(&self) -> bool {
        self.connection == ConnectionState::Connected && self.pending_connection.is_some()
    }

    /// Starts a new submission, superseding any submission in flight.
    pub fn begin_prediction(&mut self) -> RequestToken {
        let token = self.issue_token();
        self.submission = SubmissionState::Loading;
        self.pending_prediction = Some(token);
        token
    }

    /// Takes the pending prediction if `token` is the one being waited for.
    pub fn take_prediction(&mut self, token: RequestToken) -> bool {
        if self.pending_prediction == Some(token) {
            self.pending_prediction = None;
            true
        } else {
            false
        }
    }

    /// Fails the submission locally. A prediction still in flight is
    /// dropped when it arrives.
    pub fn reject_submission(&mut self, message: impl Into<String>) {
        self.pending_prediction = None;
        self.submission = SubmissionState::Failed(message.into());
    }

    /// Throws away the current form instance and starts a blank one.
    /// Outstanding requests for the old instance become stale.
    pub fn reset_form(&mut self) {
        self.connection = ConnectionState::Checking;
        self.vocabulary.clear();
        self.rows = SymptomRows::new();
        self.submission = SubmissionState::Idle;
        self.pending_connection = None;
        self.pending_prediction = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(rows: &SymptomRows) -> Vec<u32> {
        rows.iter().map(|row| row.id.0).collect()
    }

    #[test]
    fn test_new_rows_have_one_empty_row() {
        let rows = SymptomRows::new();
        assert_eq!(ids(&rows), vec![1]);
        assert!(rows.selected().is_empty());
        assert!(!rows.can_remove());
    }

    #[test]
    fn test_add_appends_next_id() {
        let mut rows = SymptomRows::new();
        assert_eq!(rows.add(), RowId(2));
        assert_eq!(rows.add(), RowId(3));
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_leaves_gaps() {
        let mut rows = SymptomRows::new();
        rows.add();
        rows.add();
        assert!(rows.remove(RowId(2)));
        assert_eq!(ids(&rows), vec![1, 3]);
        assert_eq!(rows.add(), RowId(4));
    }

    #[test]
    fn test_removed_highest_id_not_reused() {
        let mut rows = SymptomRows::new();
        rows.add();
        assert!(rows.remove(RowId(2)));
        assert_eq!(rows.add(), RowId(3));
        assert_eq!(ids(&rows), vec![1, 3]);
    }

    #[test]
    fn test_remove_last_row_is_noop() {
        let mut rows = SymptomRows::new();
        assert!(!rows.remove(RowId(1)));
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut rows = SymptomRows::new();
        rows.add();
        assert!(!rows.remove(RowId(42)));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_set_unknown_id_is_noop() {
        let mut rows = SymptomRows::new();
        assert!(!rows.set(RowId(9), Some(SymptomName::new("fever"))));
        assert!(rows.selected().is_empty());
    }

    #[test]
    fn test_selected_preserves_row_order() {
        let mut rows = SymptomRows::new();
        let second = rows.add();
        let third = rows.add();
        rows.set(third, Some(SymptomName::new("cough")));
        rows.set(RowId(1), Some(SymptomName::new("fever")));
        rows.set(second, Some(SymptomName::new("")));
        assert_eq!(
            rows.selected(),
            vec![SymptomName::new("fever"), SymptomName::new("cough")]
        );
    }

    #[test]
    fn test_stale_prediction_token_rejected() {
        let mut model = Model::default();
        let first = model.begin_prediction();
        let second = model.begin_prediction();
        assert!(!model.take_prediction(first));
        assert!(model.take_prediction(second));
        assert!(!model.take_prediction(second));
    }

    #[test]
    fn test_local_rejection_drops_pending_prediction() {
        let mut model = Model::default();
        let token = model.begin_prediction();
        model.reject_submission("nothing selected");
        assert!(!model.take_prediction(token));
        assert_eq!(
            model.submission,
            SubmissionState::Failed("nothing selected".into())
        );
    }

    #[test]
    fn test_reset_form_invalidates_pending_requests() {
        let mut model = Model::default();
        let connection = model.begin_connection_attempt();
        let prediction = model.begin_prediction();
        model.reset_form();
        assert!(!model.is_current_connection(connection));
        assert!(!model.take_prediction(prediction));
        assert_eq!(model.submission, SubmissionState::Idle);
    }

    #[derive(Debug, Clone)]
    enum RowOp {
        Add,
        Remove(usize),
        Set(usize, bool),
    }

    fn row_op() -> impl Strategy<Value = RowOp> {
        prop_oneof![
            Just(RowOp::Add),
            (0usize..8).prop_map(RowOp::Remove),
            (0usize..8, any::<bool>()).prop_map(|(i, filled)| RowOp::Set(i, filled)),
        ]
    }

    proptest! {
        #[test]
        fn prop_rows_stay_unique_ascending_and_nonempty(ops in prop::collection::vec(row_op(), 0..64)) {
            let mut rows = SymptomRows::new();
            let mut issued = vec![1u32];

            for op in ops {
                let current = ids(&rows);
                match op {
                    RowOp::Add => {
                        let id = rows.add();
                        prop_assert!(issued.iter().all(|seen| *seen < id.0));
                        prop_assert!(current.iter().all(|live| *live < id.0));
                        issued.push(id.0);
                    }
                    RowOp::Remove(i) => {
                        let before = rows.len();
                        let removed = rows.remove(RowId(current[i % current.len()]));
                        if before == 1 {
                            prop_assert!(!removed);
                            prop_assert_eq!(rows.len(), 1);
                        } else {
                            prop_assert!(removed);
                            prop_assert_eq!(rows.len(), before - 1);
                        }
                    }
                    RowOp::Set(i, filled) => {
                        let id = RowId(current[i % current.len()]);
                        let name = filled.then(|| SymptomName::new(format!("symptom_{}", id.0)));
                        prop_assert!(rows.set(id, name));
                    }
                }

                let after = ids(&rows);
                prop_assert!(!after.is_empty());
                prop_assert!(after.windows(2).all(|pair| pair[0] < pair[1]));
            }
        }

        #[test]
        fn prop_selected_is_ordered_filter_of_rows(flags in prop::collection::vec(any::<bool>(), 1..16)) {
            let mut rows = SymptomRows::new();
            for _ in 1..flags.len() {
                rows.add();
            }
            let all_ids = ids(&rows);
            let mut expected = Vec::new();
            for (id, filled) in all_ids.iter().zip(&flags) {
                if *filled {
                    let name = SymptomName::new(format!("s{id}"));
                    rows.set(RowId(*id), Some(name.clone()));
                    expected.push(name);
                }
            }
            prop_assert_eq!(rows.selected(), expected);
        }
    }
}
