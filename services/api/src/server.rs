use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryResponseSink, JsonFileQuestionStore, JsonFileRiskBandStore};
use crate::routes::with_quiz_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cellscan::config::AppConfig;
use cellscan::error::AppError;
use cellscan::quiz::QuizService;
use cellscan::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let questions = Arc::new(JsonFileQuestionStore::load(&config.quiz.questions_path)?);
    let bands = Arc::new(JsonFileRiskBandStore::load(&config.quiz.risk_bands_path)?);
    let sink = Arc::new(InMemoryResponseSink::default());
    let mut quiz_service =
        QuizService::new(questions, bands, sink).with_band_policy(config.quiz.band_policy);
    if let Some(ttl) = config.quiz.completed_session_ttl {
        quiz_service = quiz_service.with_completed_ttl(ttl);
    }

    let app = with_quiz_routes(Arc::new(quiz_service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    let ttl_secs = config.quiz.completed_session_ttl.map(|ttl| ttl.num_seconds());
    info!(
        ?config.environment,
        %addr,
        questions = %config.quiz.questions_path.display(),
        band_policy = ?config.quiz.band_policy,
        completed_session_ttl_secs = ?ttl_secs,
        "cellscan quiz service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
