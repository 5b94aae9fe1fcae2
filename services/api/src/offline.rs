use crate::infra::{InMemoryResponseSink, JsonFileQuestionStore, JsonFileRiskBandStore};
use cellscan::error::AppError;
use cellscan::quiz::{
    AnswerValue, BandPolicy, QuestionCatalog, QuestionRecord, QuizOutcome, QuizService,
    RiskAssessment, RiskResolution, SessionWarning, UserId,
};
use clap::Args;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Question records (JSON array)
    #[arg(long, default_value = "data/questions.json")]
    pub(crate) questions: PathBuf,
    /// Risk bands (JSON array)
    #[arg(long, default_value = "data/risk_assessments.json")]
    pub(crate) bands: PathBuf,
    /// Accept overlapping or gapped band tables
    #[arg(long)]
    pub(crate) lenient: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    #[arg(long, default_value = "data/questions.json")]
    pub(crate) questions: PathBuf,
    #[arg(long, default_value = "data/risk_assessments.json")]
    pub(crate) bands: PathBuf,
    /// JSON object mapping question id to answer, e.g. {"1": "Yes", "2": 12}
    #[arg(long)]
    pub(crate) answers: PathBuf,
    #[arg(long)]
    pub(crate) lenient: bool,
}

/// Result of checking a question file against a band file.
#[derive(Debug)]
pub(crate) struct ValidationReport {
    pub(crate) questions: usize,
    pub(crate) max_score: u32,
    pub(crate) bands: Vec<RiskAssessment>,
}

fn policy(lenient: bool) -> BandPolicy {
    if lenient {
        BandPolicy::Lenient
    } else {
        BandPolicy::Strict
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn validate(args: &ValidateArgs) -> Result<ValidationReport, AppError> {
    let records: Vec<QuestionRecord> = read_json(&args.questions)?;
    let catalog = QuestionCatalog::from_records(records)?;
    let bands: Vec<RiskAssessment> = read_json(&args.bands)?;
    let table = policy(args.lenient).build(bands)?;
    table.ensure_covers(0, catalog.max_score())?;

    Ok(ValidationReport {
        questions: catalog.len(),
        max_score: catalog.max_score(),
        bands: table.bands().to_vec(),
    })
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let report = validate(&args)?;

    println!("Question set: {}", args.questions.display());
    println!("  questions: {}", report.questions);
    println!("  attainable scores: 0..={}", report.max_score);
    println!("Risk bands: {}", args.bands.display());
    for band in &report.bands {
        println!(
            "  {:<10} {:>3}..={:<3}",
            band.risk_level, band.min_score, band.max_score
        );
    }
    println!("OK");
    Ok(())
}

/// Replays recorded answers through a fresh session, following whatever route the answers take.
pub(crate) fn score(args: &ScoreArgs) -> Result<QuizOutcome, AppError> {
    let answers: BTreeMap<u32, AnswerValue> = read_json(&args.answers)?;
    let service = QuizService::new(
        Arc::new(JsonFileQuestionStore::load(&args.questions)?),
        Arc::new(JsonFileRiskBandStore::load(&args.bands)?),
        Arc::new(InMemoryResponseSink::default()),
    )
    .with_band_policy(policy(args.lenient));

    let mut view = service.start(UserId("offline".to_string()))?;
    while let Some(question) = view.current_question.take() {
        let value = answers.get(&question.id.0).cloned().ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "{} has no answer for question {} ({})",
                    args.answers.display(),
                    question.id,
                    question.text
                ),
            ))
        })?;
        view = service.answer(&view.session_id, question.id, value)?;
    }

    view.outcome.ok_or_else(|| {
        AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "session ended without an outcome",
        ))
    })
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let outcome = score(&args)?;

    println!("Score: {}", outcome.score);
    for component in &outcome.breakdown {
        println!(
            "  question {:>3}: {:>3}  {}",
            component.question_id, component.contribution, component.notes
        );
    }
    match &outcome.risk {
        RiskResolution::Assessed { assessment, .. } => {
            println!("Risk level: {}", assessment.risk_level);
            println!("  {}", assessment.advice);
            if !assessment.foods_to_eat.is_empty() {
                println!("  Eat more: {}", assessment.foods_to_eat.join(", "));
            }
            if !assessment.foods_to_avoid.is_empty() {
                println!("  Avoid: {}", assessment.foods_to_avoid.join(", "));
            }
        }
        RiskResolution::Unavailable { reason } => {
            println!("Risk level: assessment unavailable ({reason})");
        }
    }
    for warning in &outcome.warnings {
        match warning {
            SessionWarning::Persistence { reason } => println!("warning: {reason}"),
            other => println!("warning: {other:?}"),
        }
    }
    Ok(())
}
