//! Hermes Server Entry Point

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use hermes_agent::{Collaborators, ExecutionLogger, GraphOptions, HermesGraph};
use hermes_config::{load_settings, Settings};
use hermes_core::KnowledgeSearch;
use hermes_llm::{OpenAIBackend, OpenAIConfig};
use hermes_persistence::{ConversationStore, InMemoryConversationStore, ScyllaConfig};
use hermes_rag::{
    InMemoryKnowledgeBase, KnowledgeLoader, OpenAIEmbedder, OpenAIEmbeddingConfig, VectorStore,
    VectorStoreConfig,
};
use hermes_server::{create_router, init_metrics, AppState, ChatService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("HERMES_ENV").ok();
    let config = load_settings(env.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config);

    tracing::info!("Starting Hermes Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled && init_metrics().is_some() {
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let completion = OpenAIBackend::new(OpenAIConfig::from_settings(&config.llm))
        .context("Failed to create completion backend")?;
    let embedder = Arc::new(
        OpenAIEmbedder::new(OpenAIEmbeddingConfig::from_settings(&config.embeddings))
            .context("Failed to create embedding client")?,
    );

    let (search, vector_search) = init_knowledge(&config, embedder.as_ref()).await;
    let (store, persistent) = init_persistence(&config).await;

    let graph = HermesGraph::new(
        Collaborators {
            completion: Arc::new(completion),
            embedder,
            search,
        },
        Arc::new(config.graph_config.clone()),
        GraphOptions::from_settings(&config),
        Arc::new(ExecutionLogger::new()),
    );
    let chat = ChatService::new(Arc::new(graph), store, config.graph.history_limit);

    tracing::info!(persistent, vector_search, "Initialized application state");

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host: {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    let app = create_router(AppState::new(config, chat).with_backends(persistent, vector_search));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("hermes={level},hermes_server={level},hermes_agent={level},tower_http=debug")
            .into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}

/// Knowledge search backend: Qdrant when enabled and reachable, otherwise
/// an in-memory index seeded from the knowledge directory
async fn init_knowledge(
    config: &Settings,
    embedder: &OpenAIEmbedder,
) -> (Arc<dyn KnowledgeSearch>, bool) {
    if config.rag.enabled {
        tracing::info!("Initializing VectorStore for RAG...");
        match init_vector_store(config).await {
            Ok(store) => {
                tracing::info!(
                    endpoint = %config.rag.qdrant_endpoint,
                    collection = %config.rag.qdrant_collection,
                    "VectorStore initialized for RAG"
                );
                let search: Arc<dyn KnowledgeSearch> = Arc::new(store);
                return (search, true);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize VectorStore: {}. Falling back to in-memory knowledge.",
                    e
                );
            }
        }
    }

    let knowledge = InMemoryKnowledgeBase::new();
    let dir = Path::new(&config.rag.knowledge_dir);
    match KnowledgeLoader::read_directory(dir) {
        Ok(entries) => {
            if let Err(e) = KnowledgeLoader::index(&entries, embedder, &knowledge).await {
                tracing::warn!(error = %e, "Failed to index knowledge, search will return nothing");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to read knowledge directory"),
    }
    tracing::info!(documents = knowledge.len(), "In-memory knowledge base ready");
    let search: Arc<dyn KnowledgeSearch> = Arc::new(knowledge);
    (search, false)
}

async fn init_vector_store(config: &Settings) -> Result<VectorStore, hermes_rag::RagError> {
    let store =
        VectorStore::new(VectorStoreConfig::from_settings(&config.rag, &config.embeddings)).await?;
    store.ensure_collection().await?;
    Ok(store)
}

/// Conversation store: ScyllaDB when enabled and reachable, otherwise memory
async fn init_persistence(config: &Settings) -> (Arc<dyn ConversationStore>, bool) {
    if !config.persistence.enabled {
        tracing::info!("Persistence disabled, using in-memory conversation store");
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        return (store, false);
    }

    tracing::info!("Initializing ScyllaDB persistence layer...");
    match hermes_persistence::init(ScyllaConfig::from_settings(&config.persistence)).await {
        Ok(store) => {
            tracing::info!(
                hosts = ?config.persistence.scylla_hosts,
                keyspace = %config.persistence.keyspace,
                "ScyllaDB persistence initialized"
            );
            let store: Arc<dyn ConversationStore> = Arc::new(store);
            (store, true)
        }
        Err(e) => {
            tracing::error!(
                "Failed to initialize ScyllaDB: {}. Falling back to in-memory.",
                e
            );
            let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
            (store, false)
        }
    }
}
