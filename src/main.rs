use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use authgate::auth::hash_password;
use authgate::clock::{Clock, SystemClock};
use authgate::configuration::{get_configuration, Settings, StoreBackend};
use authgate::startup::{build_auth_service, run};
use authgate::store::{
    InMemorySessionStore, InMemoryUserStore, PgSessionStore, PgUserStore, SessionStore, User,
    UserStore,
};
use authgate::telemetry::init_telemetry;

fn fatal(kind: std::io::ErrorKind, msg: &str) -> std::io::Error {
    std::io::Error::new(kind, msg.to_string())
}

async fn build_stores(
    configuration: &Settings,
) -> std::io::Result<(Arc<dyn UserStore>, Arc<dyn SessionStore>)> {
    match configuration.application.session_store {
        StoreBackend::Postgres => {
            let database = configuration.database.as_ref().ok_or_else(|| {
                tracing::error!("Postgres store selected but no database settings given");
                fatal(std::io::ErrorKind::InvalidInput, "Configuration error")
            })?;

            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    fatal(std::io::ErrorKind::ConnectionRefused, "Database connection error")
                })?;
            tracing::info!("Database connection pool created successfully");

            let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
            let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool));
            Ok((users, sessions))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; sessions are lost on restart");
            let users = InMemoryUserStore::new();

            if let Some(bootstrap) = &configuration.bootstrap_user {
                let password_hash = hash_password(&bootstrap.password).map_err(|e| {
                    tracing::error!("Failed to hash bootstrap password: {}", e);
                    fatal(std::io::ErrorKind::InvalidInput, "Configuration error")
                })?;
                users
                    .insert(User {
                        id: 1,
                        name: bootstrap.name.clone(),
                        email: bootstrap.email.clone(),
                        password_hash,
                        is_admin: bootstrap.is_admin,
                    })
                    .await
                    .map_err(|e| fatal(std::io::ErrorKind::InvalidInput, &e.to_string()))?;
                tracing::info!(email = %bootstrap.email, "Bootstrap user created");
            }

            let users: Arc<dyn UserStore> = Arc::new(users);
            let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
            Ok((users, sessions))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(fatal(std::io::ErrorKind::InvalidInput, "Configuration error"));
        }
    };

    let (users, sessions) = build_stores(&configuration).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let auth = build_auth_service(&configuration.jwt, users, sessions, clock).map_err(|e| {
        tracing::error!("Invalid token settings: {}", e);
        fatal(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    let server = run(listener, auth)?;
    tracing::info!("Server started successfully");

    server.await
}
