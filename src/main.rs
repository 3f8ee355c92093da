//! Salesdesk server
//!
//! Login-gated chat assistant over a local bicycle sales database.

use salesdesk::agent::TurnController;
use salesdesk::api::{create_router, AppState};
use salesdesk::auth::CredentialStore;
use salesdesk::llm::{LoggingClient, OpenAIChatService};
use salesdesk::sales::SalesDb;
use salesdesk::session::SessionStore;
use salesdesk::transcript::TranscriptStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salesdesk=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration. The API key has no default: refusing to start beats
    // failing every turn later.
    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        tracing::error!("OPENAI_API_KEY is not set; refusing to start");
        return Err("OPENAI_API_KEY is required".into());
    };

    let model = std::env::var("SALESDESK_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

    let port: u16 = std::env::var("SALESDESK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let users_db =
        std::env::var("SALESDESK_USERS_DB").unwrap_or_else(|_| "users.db".to_string());
    let sales_db =
        std::env::var("SALESDESK_SALES_DB").unwrap_or_else(|_| "sales.db".to_string());
    let transcript_dir = std::env::var("SALESDESK_TRANSCRIPT_DIR")
        .unwrap_or_else(|_| "conversations".to_string());

    // Open stores
    tracing::info!(path = %users_db, "Opening credential store");
    let auth = CredentialStore::open(&users_db)?;

    tracing::info!(path = %sales_db, "Opening sales database");
    let sales = SalesDb::open(&sales_db)?;

    // Wire up the turn controller
    let llm = Arc::new(LoggingClient::new(Arc::new(OpenAIChatService::new(
        api_key,
        model.clone(),
    ))));
    tracing::info!(model = %model, "LLM client initialized");

    let controller = Arc::new(TurnController::new(llm, sales));
    let state = AppState::new(
        auth,
        Arc::new(SessionStore::new()),
        controller,
        Arc::new(TranscriptStore::new(transcript_dir)),
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("salesdesk listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
