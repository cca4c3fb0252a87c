use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Extension, Json,
};
use pantry_core::today;
use pantry_ocr::{ReceiptDraft, ScanOutcome};
use pantry_storage::InventoryStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::session::SessionId;
use crate::state::{AppState, Backends};

const ACCEPTED_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    #[serde(flatten)]
    pub outcome: ScanOutcome,
    /// Present when items were found; the same draft is kept in the session.
    pub draft: Option<ReceiptDraft>,
}

#[derive(Debug, Serialize)]
pub struct FailedRow {
    pub row: usize,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CommitReport {
    pub added: usize,
    pub failed: Vec<FailedRow>,
}

/// A declared content type must be JPEG or PNG. The bytes are sniffed again
/// during preprocessing, so an absent header is tolerated.
fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(());
    };
    let mime = value
        .to_str()
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if ACCEPTED_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMedia(format!(
            "Expected image/jpeg or image/png, got '{mime}'"
        )))
    }
}

pub async fn scan_receipt<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ScanResponse>, ApiError> {
    let scanner = state
        .scanner
        .clone()
        .ok_or(ApiError::NotConfigured("Receipt OCR (GOOGLE_VISION_API_KEY)"))?;
    check_content_type(&headers)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("The upload is empty".into()));
    }

    let outcome = scanner.scan(&body).await?;
    let draft = match &outcome {
        ScanOutcome::NoText => return Err(ApiError::NoText),
        ScanOutcome::NothingExtracted { .. } => None,
        ScanOutcome::Items { items, .. } => {
            let draft = ReceiptDraft::from_items(items, today());
            let stored = draft.clone();
            state
                .sessions
                .update(session, |s| s.receipt_draft = Some(stored))
                .await;
            Some(draft)
        }
    };

    Ok(Json(ScanResponse { outcome, draft }))
}

pub async fn get_draft<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<ReceiptDraft>, ApiError> {
    state
        .sessions
        .get(session)
        .await
        .receipt_draft
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No receipt draft in this session".into()))
}

/// Replace the draft with the user's edited rows.
pub async fn put_draft<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
    ApiJson(draft): ApiJson<ReceiptDraft>,
) -> Json<ReceiptDraft> {
    let stored = draft.clone();
    state
        .sessions
        .update(session, |s| s.receipt_draft = Some(stored))
        .await;
    Json(draft)
}

pub async fn cancel_draft<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
) -> StatusCode {
    state
        .sessions
        .update_existing(session, |s| s.receipt_draft = None)
        .await;
    StatusCode::NO_CONTENT
}

/// Import every named row of the draft. Rows fail independently; the draft
/// is discarded afterwards either way.
pub async fn commit_draft<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<CommitReport>, ApiError> {
    let draft = state
        .sessions
        .update_existing(session, |s| s.receipt_draft.take())
        .await
        .flatten()
        .ok_or_else(|| ApiError::NotFound("No receipt draft in this session".into()))?;

    let mut report = CommitReport {
        added: 0,
        failed: Vec::new(),
    };
    for (row, entry) in draft.rows.iter().enumerate() {
        if entry.is_blank() {
            continue;
        }
        let result = match entry.to_new_item() {
            Ok(item) => state.store.create(item).await.map_err(ApiError::from),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(_) => report.added += 1,
            Err(e) => {
                tracing::warn!(row, name = %entry.name, error = %e, "Draft row not imported");
                report.failed.push(FailedRow {
                    row,
                    name: entry.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(added = report.added, failed = report.failed.len(), "Receipt draft imported");
    Ok(Json(report))
}
