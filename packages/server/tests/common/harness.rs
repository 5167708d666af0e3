//! Test harnesses.
//!
//! `MemoryHarness` runs the full bus and registry over the in-memory store and
//! needs nothing external. `PgHarness` runs against a shared Postgres
//! container (started once, migrated once) and needs Docker.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::Router;
use ladle::testing::RecordingSink;
use ladle::{
    BusConfig, Document, Filter, InMemoryStore, MessageBus, Query, Session, SessionFactory,
    StoreError,
};
use server_core::kernel::{build_registry, AppBus, MenuUnitOfWorkFactory, PgStore};
use server_core::server::{build_app, AppState};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Initialize tracing once. Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn bus_over(factory: MenuUnitOfWorkFactory, config: BusConfig, sink: RecordingSink) -> AppBus {
    let registry = build_registry().expect("registry is valid");
    MessageBus::builder(factory, registry)
        .with_config(config)
        .with_failure_sink(sink)
        .build()
}

/// Full application over the in-memory store.
pub struct MemoryHarness {
    pub bus: AppBus,
    pub factory: MenuUnitOfWorkFactory,
    pub store: InMemoryStore,
    /// Every event handler failure reported by the bus.
    pub failures: RecordingSink,
}

impl MemoryHarness {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        init_tracing();
        let (factory, store) = MenuUnitOfWorkFactory::in_memory();
        Self::over(factory, store, config)
    }

    /// Every read takes `delay`, so concurrent handlers reliably read the
    /// same version before either writes.
    pub fn with_slow_reads(delay: Duration) -> Self {
        init_tracing();
        let store = InMemoryStore::new();
        let sessions = SlowReads {
            store: store.clone(),
            delay,
        };
        let factory = MenuUnitOfWorkFactory::new(Arc::new(sessions));
        Self::over(factory, store, BusConfig::default())
    }

    fn over(factory: MenuUnitOfWorkFactory, store: InMemoryStore, config: BusConfig) -> Self {
        let failures = RecordingSink::new();
        Self {
            bus: bus_over(factory.clone(), config, failures.clone()),
            factory,
            store,
            failures,
        }
    }

    pub fn router(&self) -> Router {
        build_app(AppState::new(self.bus.clone(), None))
    }
}

/// In-memory sessions whose point reads are delayed.
struct SlowReads {
    store: InMemoryStore,
    delay: Duration,
}

#[async_trait]
impl SessionFactory for SlowReads {
    async fn open(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(SlowSession {
            inner: self.store.open().await?,
            delay: self.delay,
        }))
    }
}

struct SlowSession {
    inner: Box<dyn Session>,
    delay: Duration,
}

#[async_trait]
impl Session for SlowSession {
    async fn load(&mut self, kind: &'static str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let document = self.inner.load(kind, id).await?;
        tokio::time::sleep(self.delay).await;
        Ok(document)
    }

    async fn load_many(
        &mut self,
        kind: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.load_many(kind, ids).await
    }

    async fn query(&mut self, kind: &'static str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(kind, query).await
    }

    async fn count(&mut self, kind: &'static str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(kind, filter).await
    }

    async fn stage(
        &mut self,
        kind: &'static str,
        id: Uuid,
        document: Document,
    ) -> Result<(), StoreError> {
        self.inner.stage(kind, id, document).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.inner.rollback().await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Full application over Postgres.
///
/// # Example
///
/// ```ignore
/// #[test_context(PgHarness)]
/// #[tokio::test]
/// #[ignore = "requires Docker"]
/// async fn my_test(ctx: &PgHarness) {
///     let id = ctx.bus.handle(AddProduct { .. }).await.unwrap();
/// }
/// ```
pub struct PgHarness {
    pub db_pool: PgPool,
    pub bus: AppBus,
    pub factory: MenuUnitOfWorkFactory,
    pub failures: RecordingSink,
}

impl AsyncTestContext for PgHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl PgHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let factory = MenuUnitOfWorkFactory::new(Arc::new(PgStore::new(db_pool.clone())));
        let failures = RecordingSink::new();
        Ok(Self {
            bus: bus_over(factory.clone(), BusConfig::default(), failures.clone()),
            factory,
            db_pool,
            failures,
        })
    }
}
