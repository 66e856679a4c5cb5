use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        ConnectInfo, Multipart, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::models::{messages, DetectResponse, QaRequest, QaResponse};
use crate::config::{Config, DetectConfig};
use crate::metrics::METRICS;
use crate::model::{ImageData, VisionModel};
use crate::session::{FollowUpPolicy, SessionEntry, SessionKeyStrategy, SessionSlot, SessionStore};

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub model: Arc<dyn VisionModel>,
    pub followup: Arc<FollowUpPolicy>,
    pub key_strategy: SessionKeyStrategy,
    pub detect: Arc<DetectConfig>,
}

impl AppState {
    pub fn new(config: &Config, model: Arc<dyn VisionModel>) -> Self {
        Self {
            store: Arc::new(SessionStore::new(&config.session)),
            model,
            followup: Arc::new(FollowUpPolicy::new(&config.followup.phrases)),
            key_strategy: config.session.key_strategy,
            detect: Arc::new(config.detect.clone()),
        }
    }
}

/// Identify the main object in an uploaded image and open a session for it
///
/// POST /detect
pub async fn detect(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<DetectResponse>) {
    let start = Instant::now();

    let image = match multipart {
        Ok(multipart) => match read_image(multipart).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Unreadable multipart upload from {}: {}", peer, e);
                METRICS.record_detect("bad_upload", start.elapsed());
                return (StatusCode::BAD_REQUEST, Json(DetectResponse::not_detected()));
            }
        },
        Err(rejection) => {
            warn!("Detect request without multipart body: {}", rejection.body_text());
            None
        }
    };

    let Some(image) = image.filter(|image| !image.is_empty()) else {
        METRICS.record_detect("missing_image", start.elapsed());
        return (StatusCode::BAD_REQUEST, Json(DetectResponse::not_detected()));
    };

    info!(
        "Image size: {} bytes ({:.2} KB), {}",
        image.len(),
        image.len() as f64 / 1024.0,
        image.mime()
    );

    let label = match state.model.describe(&image).await {
        Ok(label) => label,
        Err(e) => {
            error!("Object detection failed: {}", e);
            METRICS.record_detect("model_error", start.elapsed());
            info!("Detect processing time: {:?}", start.elapsed());
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DetectResponse::failed(e.to_string())),
            );
        }
    };

    let label = label.trim();
    if label.is_empty() {
        info!("No object identified; detect processing time: {:?}", start.elapsed());
        METRICS.record_detect("not_detected", start.elapsed());
        return (StatusCode::OK, Json(DetectResponse::not_detected()));
    }

    let issued = state.key_strategy.issue(peer);
    state.store.put(&issued.key, label.to_string(), image).await;
    METRICS.set_active_sessions(state.store.len());

    let desc = state.detect.describe(label);
    info!("Detected '{}'; detect processing time: {:?}", label, start.elapsed());
    METRICS.record_detect("detected", start.elapsed());

    (
        StatusCode::OK,
        Json(DetectResponse::detected(label, desc, issued.token)),
    )
}

/// First `image` field of the form, if any
async fn read_image(mut multipart: Multipart) -> Result<Option<ImageData>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let mime = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Some(ImageData::new(bytes, mime.as_deref())));
    }
    Ok(None)
}

/// Answer a question about the session's object. Always 200.
///
/// POST /object_qa
pub async fn object_qa(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Result<Json<QaRequest>, JsonRejection>,
) -> Json<QaResponse> {
    let start = Instant::now();

    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Malformed object_qa body: {}", rejection.body_text());
            METRICS.record_qa("bad_request", start.elapsed());
            return Json(QaResponse::failed(rejection.body_text()));
        }
    };

    let Some((slot, entry)) = lookup(&state, peer, request.token.as_deref()).await else {
        debug!("No session for object_qa from {}", peer);
        METRICS.record_qa("no_session", start.elapsed());
        return Json(QaResponse::no_object());
    };

    let question = request.question.trim();
    if question.is_empty() {
        METRICS.record_qa("empty_question", start.elapsed());
        return Json(QaResponse::answered(messages::EMPTY_QUESTION, entry.object_label));
    }

    let effective = state
        .followup
        .rewrite(entry.last_question.as_deref(), question);
    if matches!(effective, Cow::Owned(_)) {
        METRICS.record_followup_rewrite();
        debug!("Follow-up rewritten: '{}' -> '{}'", question, effective);
    }

    info!(
        "Question about '{}' (detected {}s ago): {}",
        entry.object_label,
        entry.age().num_seconds(),
        effective
    );

    match state
        .model
        .answer(&entry.object_label, &entry.image, &effective)
        .await
    {
        Ok(answer) => {
            // lands on this detection only, even if the key was re-detected meanwhile
            slot.record_exchange(question.to_string(), answer.clone());
            METRICS.record_qa("answered", start.elapsed());
            Json(QaResponse::answered(answer, entry.object_label))
        }
        Err(e) => {
            error!("Object Q&A failed: {}", e);
            METRICS.record_qa("model_error", start.elapsed());
            Json(QaResponse::failed(e.to_string()))
        }
    }
}

async fn lookup(
    state: &AppState,
    peer: SocketAddr,
    token: Option<&str>,
) -> Option<(SessionSlot, SessionEntry)> {
    let key = state.key_strategy.resolve(peer, token)?;
    let slot = state.store.slot(&key).await?;
    let entry = slot.snapshot();
    Some((slot, entry))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": state.store.len(),
        "key_strategy": state.key_strategy.as_str(),
    }))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    METRICS.set_active_sessions(state.store.len());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}
