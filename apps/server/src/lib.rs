//! # Scribe Server
//!
//! Boots the handwriting recognition service. [`ServerBuilder::build`] connects
//! `SurrealDB`, opens the media store and loads the CRNN through the feature slices.
//! [`Server::run`] then serves the router over HTTP, or HTTPS when `server.ssl` is set.
//!
//! ```no_run
//! use scribe_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder().port(4583).build().await?.run().await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow, bail};
use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use scribe::domain::config::{ApiConfig, SslConfig};
use scribe::kernel::server::ApiState;
use scribe_database::Database;
use scribe_storage::Storage;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// The application router for an already assembled state.
///
/// Tests drive this with `tower::ServiceExt::oneshot` instead of binding a socket.
pub fn app(state: ApiState) -> Router {
    router::init(state)
}

#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Overrides `server.port`.
    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    async fn init_database(&self) -> Result<Database> {
        let db = &self.cfg.database;
        let mut builder = Database::builder().url(&db.url).session(&db.namespace, &db.database);
        if let Some(creds) = &db.credentials {
            builder = builder.auth(&creds.username, &creds.password);
        }

        builder.init().await.with_context(|| format!("Failed to open database at {}", db.url))
    }

    /// Flat layout: a stored path is also the URL suffix under `storage.media_url`.
    async fn init_storage(&self) -> Result<Storage> {
        let data_dir = &self.cfg.storage.data_dir;
        Storage::builder()
            .root(data_dir)
            .sharding(false)
            .connect()
            .await
            .with_context(|| format!("Failed to open media store at {}", data_dir.display()))
    }

    /// Connects every backend and builds the feature slices.
    ///
    /// # Errors
    /// Fails when the TLS files are missing, the database or media directory is
    /// unusable, or the model weights cannot be loaded (unless `model.allow_missing`).
    pub async fn build(self) -> Result<Server> {
        scribe::kernel::server::mark_started();

        if let Some(ssl) = &self.cfg.server.ssl {
            check_tls_files(ssl)?;
        }

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(%address, data_dir = %self.cfg.storage.data_dir.display(), "Initializing server");

        let db = self.init_database().await?;
        let storage = self.init_storage().await?;

        let slices = scribe::init(&self.cfg, &db, &storage)
            .map_err(|e| anyhow!("Feature initialization failed: {e}"))?;

        let state = ApiState::builder()
            .config(self.cfg)
            .db(db)
            .storage(storage)
            .register_slices(slices)
            .build()
            .context("Failed to assemble application state")?;

        Ok(Server { state })
    }
}

fn check_tls_files(ssl: &SslConfig) -> Result<()> {
    for (what, path) in [("certificate", &ssl.cert), ("key", &ssl.key)] {
        if !path.is_file() {
            bail!("TLS {what} not found at {}", path.display());
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = ssl.key.metadata()?.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                key = %ssl.key.display(),
                mode = %format!("{mode:o}"),
                "TLS key is readable by others, expected mode 600"
            );
        }
    }
    Ok(())
}

/// A built server. Nothing listens until [`Server::run`].
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Serves until Ctrl+C or SIGTERM, then drains for up to 30 seconds.
    ///
    /// # Errors
    /// Fails if the address cannot be bound or the TLS material is rejected.
    pub async fn run(self) -> Result<()> {
        let server_cfg = self.state.config.server.clone();
        let address = SocketAddr::new(server_cfg.address, server_cfg.port);
        let app = self.router().into_make_service();

        let handle = Handle::<SocketAddr>::new();
        tokio::spawn(drain_on_signal(handle.clone()));

        match &server_cfg.ssl {
            Some(ssl) => {
                let tls = RustlsConfig::from_pem_file(&ssl.cert, &ssl.key)
                    .await
                    .context("Failed to load TLS certificate and key")?;
                info!("Listening on https://{address}");
                axum_server::bind_rustls(address, tls)
                    .handle(handle)
                    .serve(app)
                    .await
                    .context("HTTPS server failed")?;
            },
            None => {
                info!("Listening on http://{address}");
                axum_server::bind(address)
                    .handle(handle)
                    .serve(app)
                    .await
                    .context("HTTP server failed")?;
            },
        }

        info!("Server stopped");
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }
}

async fn drain_on_signal(handle: Handle<SocketAddr>) {
    match shutdown_signal().await {
        Ok(()) => {
            info!(grace = ?SHUTDOWN_GRACE, "Shutdown requested, draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        },
        Err(e) => error!("Shutdown listener failed: {e:#}"),
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to listen for SIGTERM")?
            .recv()
            .await;
        Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
