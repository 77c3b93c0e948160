//! Servidor HTTP Axum para análise de documentos com o prose-core.
//!
//! Rotas:
//! - `GET /health`: estado do servidor e do modelo carregado
//! - `POST /analyze`: `{text, segment?, tag?, extract?, language?, tokenizer?}`
//!
//! Configuração por variáveis de ambiente:
//! - `PROSE_MODEL_DIR`: diretório do modelo (sem ele, só tokenização e segmentação)
//! - `PROSE_ADDR`: endereço de escuta (padrão `0.0.0.0:3000`)
//! - `RUST_LOG`: filtro do tracing (padrão `info`)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use prose_core::{
    AnalyzeOptions, Document, Entity, Error, Language, Model, Pipeline, Segmenter, Token,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    model: Option<Arc<Model>>,
    /// Segmentadores pré-compilados por idioma.
    segmenters: HashMap<Language, Arc<Segmenter>>,
}

impl AppState {
    fn pipeline(&self, mut options: AnalyzeOptions) -> prose_core::Result<Pipeline> {
        options.model = self.model.clone();
        let mut builder = Pipeline::builder();
        if let Some(segmenter) = self.segmenters.get(&options.language) {
            builder = builder.segmenter(Arc::clone(segmenter));
        }
        builder.options(options).build()
    }
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
    #[serde(flatten)]
    options: AnalyzeOptions,
}

#[derive(Serialize)]
struct SentenceView {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    tokens: Vec<Token>,
    sentences: Vec<SentenceView>,
    entities: Vec<Entity>,
    total_tokens: usize,
    processing_ms: u64,
}

impl AnalyzeResponse {
    fn new(doc: Document, processing_ms: u64) -> Self {
        let sentences = doc
            .sentences()
            .iter()
            .map(|s| SentenceView {
                start: s.start,
                end: s.end,
                text: doc.sentence_text(s).to_string(),
            })
            .collect();
        Self {
            total_tokens: doc.tokens().len(),
            tokens: doc.tokens().to_vec(),
            entities: doc.entities().to_vec(),
            sentences,
            processing_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let model = match std::env::var_os("PROSE_MODEL_DIR") {
        Some(dir) => Some(Arc::new(Model::from_dir(dir)?)),
        None => {
            warn!("PROSE_MODEL_DIR not set; tagging and extraction are disabled");
            None
        }
    };
    let mut segmenters = HashMap::new();
    for language in [Language::En, Language::Fr, Language::Es] {
        segmenters.insert(language, Arc::new(Segmenter::new(language)?));
    }
    let state = Arc::new(AppState { model, segmenters });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .layer(cors)
        .with_state(state);

    let addr = std::env::var("PROSE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("servidor prose iniciado em http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.model.as_ref().map(|m| m.name.as_str()),
        "tagger": state.model.as_ref().is_some_and(|m| m.tagger.is_some()),
        "extractor": state.model.as_ref().is_some_and(|m| m.extractor.is_some()),
    }))
}

/// Análise via HTTP POST
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty text");
    }

    let pipeline = match state.pipeline(req.options) {
        Ok(pipeline) => pipeline,
        Err(err) => return error_response(status_for(&err), &err.to_string()),
    };

    info!(chars = req.text.len(), "analisando documento");
    // o pipeline é síncrono; roda fora do runtime
    let result = tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let doc = pipeline.analyze(&req.text);
        AnalyzeResponse::new(doc, started.elapsed().as_millis() as u64)
    })
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            error!(%err, "analysis task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "analysis failed")
        }
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::MissingModel { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let segmenters = [(Language::En, Arc::new(Segmenter::new(Language::En).unwrap()))]
            .into_iter()
            .collect();
        AppState {
            model: None,
            segmenters,
        }
    }

    #[test]
    fn test_request_defaults() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"text": "Hi.", "tag": false}"#).unwrap();
        assert_eq!(req.text, "Hi.");
        assert!(req.options.segment);
        assert!(!req.options.tag);
        assert!(req.options.extract);
    }

    #[test]
    fn test_missing_model_is_unprocessable() {
        let err = state().pipeline(AnalyzeOptions::default()).unwrap_err();
        assert_eq!(status_for(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_response_shape() {
        let options = AnalyzeOptions {
            tag: false,
            extract: false,
            ..AnalyzeOptions::default()
        };
        let pipeline = state().pipeline(options).unwrap();
        let response = AnalyzeResponse::new(pipeline.analyze("One. Two."), 0);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_tokens"], 4);
        assert_eq!(json["sentences"][1]["text"], "Two.");
        assert_eq!(json["entities"], serde_json::json!([]));
    }
}
