use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::quiz::catalog::{QuestionCatalog, QuestionRecord};
use crate::quiz::domain::{BranchTable, Question, QuestionId, QuestionKind, RiskAssessment};
use crate::quiz::repository::{
    PersistenceError, QuestionLoadError, QuestionStore, ResponseBatch, ResponseSink,
    RiskBandLoadError, RiskBandStore,
};
use crate::quiz::service::QuizService;

pub(super) fn boolean(id: u32, weight: u32) -> Question {
    Question {
        id: QuestionId(id),
        text: format!("Boolean question {id}"),
        category: None,
        kind: QuestionKind::Boolean {
            choices: vec!["Yes".to_string(), "No".to_string()],
        },
        weight,
        branching: None,
    }
}

pub(super) fn range(id: u32, min: f64, max: f64, weight: u32) -> Question {
    Question {
        id: QuestionId(id),
        text: format!("Range question {id}"),
        category: None,
        kind: QuestionKind::Range {
            min,
            max,
            step: 1.0,
        },
        weight,
        branching: None,
    }
}

pub(super) fn select(id: u32, options: &[&str], weight: u32) -> Question {
    Question {
        id: QuestionId(id),
        text: format!("Select question {id}"),
        category: None,
        kind: QuestionKind::Select {
            options: options.iter().map(|option| option.to_string()).collect(),
        },
        weight,
        branching: None,
    }
}

/// Attaches `answer -> target` routes and an optional default to a question.
pub(super) fn branching(
    mut question: Question,
    routes: &[(&str, u32)],
    default: Option<u32>,
) -> Question {
    let routes: BTreeMap<String, QuestionId> = routes
        .iter()
        .map(|(answer, target)| (answer.to_string(), QuestionId(*target)))
        .collect();
    question.branching = Some(BranchTable::new(routes, default.map(QuestionId)));
    question
}

pub(super) fn catalog(questions: Vec<Question>) -> QuestionCatalog {
    QuestionCatalog::new(questions).expect("valid catalog")
}

pub(super) fn band(risk_level: &str, min_score: u32, max_score: u32) -> RiskAssessment {
    RiskAssessment {
        id: None,
        risk_level: risk_level.to_string(),
        min_score,
        max_score,
        advice: format!("{risk_level} risk advice"),
        foods_to_eat: vec!["Leafy greens".to_string()],
        foods_to_avoid: vec!["Processed meat".to_string()],
    }
}

pub(super) fn standard_bands() -> Vec<RiskAssessment> {
    vec![
        band("Low", 0, 29),
        band("Moderate", 30, 50),
        band("High", 51, 100),
    ]
}

/// Smoking questionnaire: 1 branches on "Yes" to 2 and skips to 3 otherwise.
pub(super) fn question_records() -> Vec<QuestionRecord> {
    vec![
        QuestionRecord {
            id: 1,
            question_text: "Do you smoke?".to_string(),
            question_type: "boolean".to_string(),
            options: Some(json!({ "options": ["Yes", "No"] })),
            weight: Some(20.0),
            next_question_logic: Some(json!({ "Yes": 2, "No": 3 })),
            category: Some("lifestyle".to_string()),
        },
        QuestionRecord {
            id: 2,
            question_text: "Cigarettes per day?".to_string(),
            question_type: "range".to_string(),
            options: Some(json!({ "min": 1, "max": 21, "step": 1 })),
            weight: Some(20.0),
            next_question_logic: None,
            category: Some("lifestyle".to_string()),
        },
        QuestionRecord {
            id: 3,
            question_text: "How often do you drink alcohol?".to_string(),
            question_type: "select".to_string(),
            options: Some(json!({ "options": ["Never", "Monthly", "Weekly", "Daily"] })),
            weight: Some(30.0),
            next_question_logic: None,
            category: None,
        },
    ]
}

#[derive(Clone)]
pub(super) struct MemoryQuestionStore {
    records: Vec<QuestionRecord>,
}

impl MemoryQuestionStore {
    pub(super) fn new(records: Vec<QuestionRecord>) -> Self {
        Self { records }
    }
}

impl QuestionStore for MemoryQuestionStore {
    fn load_questions(&self) -> Result<Vec<QuestionRecord>, QuestionLoadError> {
        Ok(self.records.clone())
    }
}

pub(super) struct OfflineQuestionStore;

impl QuestionStore for OfflineQuestionStore {
    fn load_questions(&self) -> Result<Vec<QuestionRecord>, QuestionLoadError> {
        Err(QuestionLoadError::Unavailable("database offline".to_string()))
    }
}

#[derive(Clone)]
pub(super) struct MemoryBandStore {
    bands: Vec<RiskAssessment>,
}

impl MemoryBandStore {
    pub(super) fn new(bands: Vec<RiskAssessment>) -> Self {
        Self { bands }
    }
}

impl RiskBandStore for MemoryBandStore {
    fn load_bands(&self) -> Result<Vec<RiskAssessment>, RiskBandLoadError> {
        Ok(self.bands.clone())
    }
}

pub(super) struct OfflineBandStore;

impl RiskBandStore for OfflineBandStore {
    fn load_bands(&self) -> Result<Vec<RiskAssessment>, RiskBandLoadError> {
        Err(RiskBandLoadError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    batches: Arc<Mutex<Vec<ResponseBatch>>>,
}

impl MemorySink {
    pub(super) fn batches(&self) -> Vec<ResponseBatch> {
        self.batches.lock().expect("sink mutex poisoned").clone()
    }
}

impl ResponseSink for MemorySink {
    fn store(&self, batch: &ResponseBatch) -> Result<(), PersistenceError> {
        self.batches
            .lock()
            .expect("sink mutex poisoned")
            .push(batch.clone());
        Ok(())
    }
}

pub(super) struct OfflineSink;

impl ResponseSink for OfflineSink {
    fn store(&self, _batch: &ResponseBatch) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("write timeout".to_string()))
    }
}

pub(super) type MemoryService = QuizService<MemoryQuestionStore, MemoryBandStore, MemorySink>;

pub(super) fn build_service() -> (MemoryService, Arc<MemorySink>) {
    build_service_with(question_records(), standard_bands())
}

pub(super) fn build_service_with(
    records: Vec<QuestionRecord>,
    bands: Vec<RiskAssessment>,
) -> (MemoryService, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let service = QuizService::new(
        Arc::new(MemoryQuestionStore::new(records)),
        Arc::new(MemoryBandStore::new(bands)),
        sink.clone(),
    );
    (service, sink)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
