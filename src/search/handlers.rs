use super::engine::SearchService;
use super::types::{ErrorResponse, SearchParams};
use crate::error::SyncError;
use crate::projection::types::Record;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

type SearchResult = Result<Json<Vec<Record>>, (StatusCode, Json<ErrorResponse>)>;

pub async fn handle_search(
    Extension(service): Extension<Arc<SearchService>>,
    Path(collection): Path<String>,
    Query(params): Query<SearchParams>,
) -> SearchResult {
    run_search(&service, &collection, params).await
}

pub async fn handle_search_questions(
    Extension(service): Extension<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> SearchResult {
    let params = SearchParams {
        categories: None,
        ..params
    };
    run_search(&service, "questions", params).await
}

pub async fn handle_search_users(
    Extension(service): Extension<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> SearchResult {
    let params = SearchParams {
        categories: None,
        ..params
    };
    run_search(&service, "users", params).await
}

pub async fn handle_search_questions_by_categories(
    Extension(service): Extension<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> SearchResult {
    if params.categories.is_none() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "missing 'categories' parameter".to_string(),
        ));
    }
    run_search(&service, "questions", params).await
}

async fn run_search(service: &SearchService, collection: &str, params: SearchParams) -> SearchResult {
    let Some(schema) = service.catalog().get(collection) else {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("unknown collection '{}'", collection),
        ));
    };

    let result = match params.categories.as_deref() {
        Some(_) if schema.filter_field.is_none() => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("collection '{}' does not support category filters", collection),
            ));
        }
        Some(categories) => {
            service
                .search_by_categories(&params.search_query, categories, collection)
                .await
        }
        None => service.search(&params.search_query, None, collection).await,
    };

    match result {
        Ok(records) => {
            tracing::debug!("Search on {} returned {} records", collection, records.len());
            Ok(Json(records))
        }
        Err(e) => {
            tracing::error!("Search on {} failed: {}", collection, e);
            let status = match e {
                SyncError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(error_response(status, e.to_string()))
        }
    }
}

fn error_response(status: StatusCode, error: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error }))
}
