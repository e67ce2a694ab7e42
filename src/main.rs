use axum::{
    Extension, Router,
    routing::get,
};
use clap::Parser;
use search_sync::config::Args;
use search_sync::context::{self, AppContext};
use search_sync::search::handlers::{
    handle_search, handle_search_questions, handle_search_questions_by_categories,
    handle_search_users,
};
use search_sync::storage::handlers::{
    handle_delete_document, handle_get_document, handle_put_document,
};
use search_sync::storage::memory::{MemoryDocumentStore, MemorySearchIndex};
use search_sync::storage::protocol::ENDPOINT_DOCUMENTS;
use search_sync::storage::provider::{ChangeSource, SearchIndex};
use search_sync::storage::rest::RestSearchIndex;
use search_sync::sync::dispatcher::{SyncDispatcher, handle_health};
use search_sync::sync::handlers::register_sync_handlers;
use search_sync::sync::registry::SyncHandlerRegistry;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .init();

    tracing::info!("Starting search-sync on {}", args.listen);

    // 1. Clients:
    let store = MemoryDocumentStore::new();
    let index: Arc<dyn SearchIndex> = match &args.index_url {
        Some(url) => {
            tracing::info!("Using remote index provider at {}", url);
            Arc::new(
                RestSearchIndex::new(url, &args.index_app_id, &args.index_api_key)?
                    .with_timeout(args.index_timeout()),
            )
        }
        None => {
            tracing::info!("Using in-memory index");
            MemorySearchIndex::new()
        }
    };

    let ctx = context::init(AppContext::new(store.clone(), index, args.catalog()))?;

    // 2. Write path:
    let registry = SyncHandlerRegistry::new();
    register_sync_handlers(&registry, &ctx.catalog, ctx.index.clone());

    let dispatcher = SyncDispatcher::new(
        registry,
        args.dispatch_workers,
        args.delivery_policy(),
    );
    let _dispatch_handle = dispatcher.clone().start(store.subscribe());

    // 3. HTTP Router:
    let search_service = Arc::new(ctx.search_service());
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/search/:collection", get(handle_search))
        .route("/searchForQuestions", get(handle_search_questions))
        .route("/searchForUsers", get(handle_search_users))
        .route(
            "/searchForQuestionsByCategories",
            get(handle_search_questions_by_categories),
        )
        .route(
            ENDPOINT_DOCUMENTS,
            get(handle_get_document)
                .put(handle_put_document)
                .delete(handle_delete_document),
        )
        .layer(Extension(search_service))
        .layer(Extension(store))
        .layer(Extension(dispatcher));

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", args.listen);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
