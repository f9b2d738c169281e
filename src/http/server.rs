//! Dev server host.
//!
//! # Responsibilities
//! - Create the Axum router around the bridge middleware
//! - Serve the live-reload client and event stream
//! - Serve the public directory as the final fallback
//! - Wire up middleware (request ID, tracing, connection info)
//! - Bind plain TCP or TLS and shut down gracefully
//! - Start the source watcher when enabled
//!
//! # Data Flow
//! ```text
//! request
//!     → SetRequestId → Trace → PropagateRequestId → ConnectionInfo
//!     → reload routes (client script, event stream)
//!     → bridge middleware ─ pass-through ─▶ public dir (ServeDir) / 404
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::get, Router};
use notify::RecommendedWatcher;
use tokio::net::TcpListener;
use tower_http::{
    add_extension::AddExtensionLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::BridgeOptions;
use crate::http::middleware::{bridge_middleware, Bridge};
use crate::http::request::{ConnectionInfo, MakeRequestUuid};
use crate::lifecycle::Shutdown;
use crate::module::ModuleLoader;
use crate::net::{load_tls_config, TlsError};
use crate::reload::{client_script_handler, events_handler, render_client_script, ReloadHub, SourceWatcher};

/// How long TLS connections get to finish after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(5);

/// Error type for running the host.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Interactive dev server hosting the bridge.
pub struct DevServer {
    options: Arc<BridgeOptions>,
    bridge: Arc<Bridge>,
    hub: ReloadHub,
    shutdown: Shutdown,
}

impl DevServer {
    pub fn new(options: BridgeOptions, loader: Arc<dyn ModuleLoader>) -> Self {
        let shutdown = Shutdown::new();
        let bridge = Arc::new(Bridge::new(&options, loader));
        Self {
            options: Arc::new(options),
            bridge,
            hub: ReloadHub::default().with_shutdown(shutdown.clone()),
            shutdown,
        }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Handle that stops the server when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Build the router. `encrypted` is reported to handlers through
    /// [`ConnectionInfo`].
    pub fn router(&self, encrypted: bool) -> Router {
        let script: Arc<str> = render_client_script(&self.options.events_path).into();

        Router::new()
            .route(
                &self.options.client_script_path,
                get(client_script_handler).with_state(script),
            )
            .route(
                &self.options.events_path,
                get(events_handler).with_state(self.hub.clone()),
            )
            .fallback_service(self.app())
            .layer(AddExtensionLayer::new(ConnectionInfo { encrypted }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Bridge in front of the public directory.
    fn app(&self) -> Router {
        let base = self.options.match_options.base.as_str();
        let app = match self.options.public_dir() {
            Some(dir) if base.is_empty() => Router::new().fallback_service(ServeDir::new(dir)),
            Some(dir) => Router::new()
                .nest_service(base, ServeDir::new(dir))
                .fallback(not_found),
            None => Router::new().fallback(not_found),
        };
        app.layer(middleware::from_fn_with_state(
            self.bridge.clone(),
            bridge_middleware,
        ))
    }

    /// Bind according to the options, start the watcher, and serve until
    /// shutdown.
    pub async fn serve(self) -> Result<(), ServerError> {
        let _watcher = self.start_watcher()?;

        match self.options.tls.clone() {
            Some(tls) => {
                let config = load_tls_config(&tls.cert_path, &tls.key_path).await?;
                self.run_tls(config).await
            }
            None => {
                let listener = TcpListener::bind(self.options.bind_address).await?;
                self.run(listener).await
            }
        }
    }

    /// Serve plain HTTP on an already bound listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        self.log_start(addr, "http");

        let app = self.router(false);
        axum::serve(listener, app)
            .with_graceful_shutdown(self.shutdown.wait())
            .await?;

        tracing::info!("Dev server stopped");
        Ok(())
    }

    /// Serve HTTPS on the configured bind address.
    pub async fn run_tls(
        self,
        config: axum_server::tls_rustls::RustlsConfig,
    ) -> Result<(), ServerError> {
        let addr = self.options.bind_address;
        self.log_start(addr, "https");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        let stop = self.shutdown.wait();
        tokio::spawn(async move {
            stop.await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        let app = self.router(true);
        axum_server::bind_rustls(addr, config)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;

        tracing::info!("Dev server stopped");
        Ok(())
    }

    fn start_watcher(&self) -> Result<Option<RecommendedWatcher>, ServerError> {
        if !self.options.watch {
            return Ok(None);
        }
        let watcher = SourceWatcher::new(
            &self.options.root,
            vec![self.options.out_dir.clone()],
            self.hub.clone(),
        );
        Ok(Some(watcher.run()?))
    }

    fn log_start(&self, addr: SocketAddr, scheme: &str) {
        let options = &self.options;
        let routes: Vec<String> = options
            .match_options
            .server_routes
            .iter()
            .map(ToString::to_string)
            .collect();

        tracing::info!(
            address = %addr,
            url = %format!("{}://{}{}/", scheme, addr, options.match_options.base),
            entry = %options.entry,
            server_routes = ?routes,
            exclude = options.match_options.exclude.len(),
            inject_client_script = options.client_script.is_some(),
            "Dev server starting"
        );
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
