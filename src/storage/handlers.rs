use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;

use super::memory::MemoryDocumentStore;
use super::protocol::WriteResponse;
use crate::projection::types::Record;
use crate::sync::types::ChangeKind;

pub async fn handle_put_document(
    Extension(store): Extension<Arc<MemoryDocumentStore>>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<WriteResponse>) {
    let Value::Object(fields) = body else {
        tracing::warn!("Rejected non-object body for {}/{}", collection, id);
        return (
            StatusCode::BAD_REQUEST,
            Json(WriteResponse {
                success: false,
                event: None,
            }),
        );
    };

    let event = store.put(&collection, &id, fields);
    tracing::debug!("Stored {}/{} ({})", collection, id, event.kind);

    let status = match event.kind {
        ChangeKind::Created => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    (
        status,
        Json(WriteResponse {
            success: true,
            event: Some(event.kind.to_string()),
        }),
    )
}

pub async fn handle_delete_document(
    Extension(store): Extension<Arc<MemoryDocumentStore>>,
    Path((collection, id)): Path<(String, String)>,
) -> (StatusCode, Json<WriteResponse>) {
    let event = store.remove(&collection, &id);
    if event.is_none() {
        tracing::debug!("Delete of absent document {}/{}", collection, id);
    }

    (
        StatusCode::OK,
        Json(WriteResponse {
            success: true,
            event: event.map(|e| e.kind.to_string()),
        }),
    )
}

pub async fn handle_get_document(
    Extension(store): Extension<Arc<MemoryDocumentStore>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Record>, StatusCode> {
    store
        .get_local(&collection, &id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
