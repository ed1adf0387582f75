//! Process configuration and the service container handlers run against.

use std::sync::Arc;

use chrono::Duration;

use libris_catalog::{AuthorRepository, BookRepository, UserRepository};
use libris_circulation::LedgerRepository;
use libris_infra::{
    GoogleBooksClient, InMemoryLibrary, LedgerService, MetadataProvider, PostgresLibrary,
    SeedService, SeedStore,
};

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub database_url: Option<String>,
    pub use_persistent_stores: bool,
    pub google_books_base_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("LIBRIS_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("LIBRIS_JWT_SECRET not set; using a development secret");
            "dev-secret".to_string()
        });

        let token_ttl = std::env::var("LIBRIS_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Duration::minutes)
            .unwrap_or_else(|| Duration::minutes(30));

        let use_persistent_stores = std::env::var("USE_PERSISTENT_STORES")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            jwt_secret,
            token_ttl,
            database_url: std::env::var("DATABASE_URL").ok(),
            use_persistent_stores,
            google_books_base_url: std::env::var("GOOGLE_BOOKS_BASE_URL").ok(),
        }
    }
}

/// Trait objects the handlers depend on, all backed by one store so catalog
/// writes and ledger mutations share a transactional boundary.
pub struct AppServices {
    pub books: Arc<dyn BookRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub users: Arc<dyn UserRepository>,
    pub ledger: Arc<LedgerService>,
    pub seeder: Arc<SeedService>,
}

impl AppServices {
    fn from_store<S>(store: Arc<S>, provider: Arc<dyn MetadataProvider>) -> Self
    where
        S: BookRepository
            + AuthorRepository
            + UserRepository
            + LedgerRepository
            + SeedStore
            + 'static,
    {
        let ledger: Arc<dyn LedgerRepository> = store.clone();
        let seed_store: Arc<dyn SeedStore> = store.clone();
        Self {
            books: store.clone(),
            authors: store.clone(),
            users: store,
            ledger: Arc::new(LedgerService::new(ledger)),
            seeder: Arc::new(SeedService::new(provider, seed_store)),
        }
    }

    /// Volatile store, used when no database is configured and by tests,
    /// which also inject a canned metadata provider.
    pub fn in_memory(provider: Arc<dyn MetadataProvider>) -> Self {
        Self::from_store(Arc::new(InMemoryLibrary::new()), provider)
    }
}

/// Pick the storage backend from the configuration.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let provider: Arc<dyn MetadataProvider> = match &config.google_books_base_url {
        Some(base_url) => Arc::new(GoogleBooksClient::with_base_url(base_url)),
        None => Arc::new(GoogleBooksClient::new()),
    };

    match (config.use_persistent_stores, &config.database_url) {
        (true, Some(url)) => {
            let store = PostgresLibrary::connect(url).await?;
            store.ensure_schema().await?;
            tracing::info!("using postgres storage");
            Ok(AppServices::from_store(Arc::new(store), provider))
        }
        (true, None) => {
            anyhow::bail!("USE_PERSISTENT_STORES is set but DATABASE_URL is not")
        }
        (false, _) => {
            tracing::warn!("no persistent storage configured; state is volatile");
            Ok(AppServices::in_memory(provider))
        }
    }
}
