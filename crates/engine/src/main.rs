//! PersonaForge Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use personaforge_engine::api;
use personaforge_engine::app::App;
use personaforge_engine::infrastructure::{
    capability::{CapabilityRouter, ProviderSet},
    clock::SystemClock,
    ledger::InMemoryCreditLedger,
    llm::{OpenAiCompatClient, DEFAULT_BASE_URL, DEFAULT_MODEL},
    ports::ClockPort,
    queue::InMemoryAssetQueue,
    repository::InMemoryEntityRepo,
};

/// Credits granted to a user on first contact; the demo deployment has no
/// billing system behind the ledger.
const DEFAULT_STARTING_CREDITS: u32 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "personaforge_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PersonaForge Engine");

    // Load configuration
    let llm_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let llm_model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let vision_model = std::env::var("LLM_VISION_MODEL").unwrap_or_else(|_| llm_model.clone());
    // The unrestricted tier falls back to the standard provider unless a
    // dedicated backend is configured.
    let mature_url = std::env::var("LLM_MATURE_BASE_URL").unwrap_or_else(|_| llm_url.clone());
    let mature_model = std::env::var("LLM_MATURE_MODEL").unwrap_or_else(|_| llm_model.clone());
    let starting_credits: u32 = std::env::var("STARTING_CREDITS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_STARTING_CREDITS);
    let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let server_port: u16 = std::env::var("SERVER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .unwrap_or(3000);

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    // Capability providers
    let standard = ProviderSet {
        vision: Arc::new(OpenAiCompatClient::new(&llm_url, &vision_model)),
        text: Arc::new(OpenAiCompatClient::new(&llm_url, &llm_model)),
    };
    let unrestricted = ProviderSet {
        vision: Arc::new(OpenAiCompatClient::new(&mature_url, &vision_model)),
        text: Arc::new(OpenAiCompatClient::new(&mature_url, &mature_model)),
    };
    let router = Arc::new(CapabilityRouter::new(standard, unrestricted));
    tracing::info!(%llm_url, %llm_model, %vision_model, "capability providers configured");

    let ledger = Arc::new(InMemoryCreditLedger::new(clock.clone(), starting_credits));
    let repo = Arc::new(InMemoryEntityRepo::new());
    let queue = Arc::new(InMemoryAssetQueue::new());

    let app = Arc::new(App::new(router, ledger, repo, queue, clock));

    let mut http_router = api::http::routes()
        .merge(api::ws::routes())
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        http_router = http_router.layer(cors);
    }

    let addr: SocketAddr = format!("{server_host}:{server_port}").parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, http_router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
