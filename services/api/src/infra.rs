use cellscan::quiz::{
    PersistenceError, QuestionLoadError, QuestionRecord, QuestionStore, ResponseBatch,
    ResponseSink, RiskAssessment, RiskBandLoadError, RiskBandStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Why a JSON-backed store could not produce its rows.
enum FileLoadError {
    Io(io::Error),
    Json(serde_json::Error),
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, FileLoadError> {
    let raw = std::fs::read_to_string(path).map_err(FileLoadError::Io)?;
    serde_json::from_str(&raw).map_err(FileLoadError::Json)
}

/// Question rows read from a JSON array once, when the store is built.
#[derive(Debug, Clone)]
pub(crate) struct JsonFileQuestionStore {
    records: Vec<QuestionRecord>,
}

impl JsonFileQuestionStore {
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self, QuestionLoadError> {
        let path = path.as_ref();
        let records: Vec<QuestionRecord> = read_json_file(path).map_err(|err| match err {
            FileLoadError::Io(err) => {
                QuestionLoadError::Unavailable(format!("{}: {err}", path.display()))
            }
            FileLoadError::Json(err) => {
                QuestionLoadError::Malformed(format!("{}: {err}", path.display()))
            }
        })?;
        info!(path = %path.display(), questions = records.len(), "question set loaded");
        Ok(Self { records })
    }
}

impl QuestionStore for JsonFileQuestionStore {
    fn load_questions(&self) -> Result<Vec<QuestionRecord>, QuestionLoadError> {
        Ok(self.records.clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JsonFileRiskBandStore {
    bands: Vec<RiskAssessment>,
}

impl JsonFileRiskBandStore {
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self, RiskBandLoadError> {
        let path = path.as_ref();
        let bands: Vec<RiskAssessment> = read_json_file(path).map_err(|err| match err {
            FileLoadError::Io(err) => {
                RiskBandLoadError::Unavailable(format!("{}: {err}", path.display()))
            }
            FileLoadError::Json(err) => {
                RiskBandLoadError::Malformed(format!("{}: {err}", path.display()))
            }
        })?;
        info!(path = %path.display(), bands = bands.len(), "risk bands loaded");
        Ok(Self { bands })
    }
}

impl RiskBandStore for JsonFileRiskBandStore {
    fn load_bands(&self) -> Result<Vec<RiskAssessment>, RiskBandLoadError> {
        Ok(self.bands.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryResponseSink {
    batches: Arc<Mutex<Vec<ResponseBatch>>>,
}

impl ResponseSink for InMemoryResponseSink {
    fn store(&self, batch: &ResponseBatch) -> Result<(), PersistenceError> {
        let mut guard = self.batches.lock().unwrap_or_else(PoisonError::into_inner);
        guard.push(batch.clone());
        info!(
            session_id = %batch.session_id,
            responses = batch.responses.len(),
            "quiz responses stored"
        );
        Ok(())
    }
}

impl InMemoryResponseSink {
    pub(crate) fn batches(&self) -> Vec<ResponseBatch> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
