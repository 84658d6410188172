use askama_axum::Template;
use axum::{extract::State, response::IntoResponse, Form, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::{analyzer::MessageAnalyzer, types::Verdict};

pub type AppState = Arc<MessageAnalyzer>;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    result: Option<ResultView>,
}

struct ResultView {
    verdict: &'static str,
    verdict_class: &'static str,
    reasons: Vec<String>,
    confidence: String,
}

#[derive(Deserialize)]
pub struct AnalyzeForm {
    pub message: String,
}

pub async fn index() -> impl IntoResponse {
    IndexTemplate { result: None }
}

pub async fn analyze(
    State(analyzer): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> impl IntoResponse {
    let start = Instant::now();
    metrics::increment_counter!("requests_total");

    let analysis = analyzer.analyze(&form.message).await;
    let verdict = Verdict::from_score(analysis.score);

    let latency = start.elapsed().as_millis() as f64;
    metrics::histogram!("request_duration_ms", latency);
    info!(
        "Analyzed message: score {}, verdict {:?}, probability {:.3}, {:.1}ms",
        analysis.score, verdict, analysis.probability, latency
    );

    IndexTemplate {
        result: Some(ResultView {
            verdict: verdict.label(),
            verdict_class: verdict.css_class(),
            reasons: analysis.reasons,
            // always shown after analysis, including a genuine 0.00%
            confidence: format!("{:.2}", analysis.probability * 100.0),
        }),
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "phishscreen",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
