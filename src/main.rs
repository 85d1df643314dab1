use library_circulation::{
    adapters::clock::{OverridableClock, SystemClock},
    adapters::postgres::{
        PostgresBookRepository, PostgresCirculationStore, PostgresMemberRepository,
        PostgresReservationStore, PostgresSuspensionStore,
    },
    api::{handlers::AppState, router::create_router},
    application::ServiceDependencies,
    config::AppConfig,
    domain::CirculationPolicy,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_circulation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    // One clock serves both the rules and the staff time controls
    let clock = Arc::new(OverridableClock::new(SystemClock));

    let service_deps = ServiceDependencies {
        clock: clock.clone(),
        time_control: clock,
        policy: CirculationPolicy::default(),
        books: Arc::new(PostgresBookRepository::new(pool.clone())),
        members: Arc::new(PostgresMemberRepository::new(pool.clone())),
        circulation: Arc::new(PostgresCirculationStore::new(pool.clone())),
        reservations: Arc::new(PostgresReservationStore::new(pool.clone())),
        suspensions: Arc::new(PostgresSuspensionStore::new(pool)),
    };

    let app = create_router(Arc::new(AppState { service_deps }));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
