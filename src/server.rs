use axum::Router;
use axum::response::Html;
use axum::routing::get;
use tracing::info;

use crate::error::{Error, Result};

/// Listener address for [`serve`](crate::serve). Defaults to
/// `127.0.0.1:5000`.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServeOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Dotted-quad IPv4 or `localhost`; anything else is rejected before any
/// socket is touched.
fn validate_host(host: &str) -> Result<()> {
    if host == "localhost" {
        return Ok(());
    }

    let octets: Vec<&str> = host.split('.').collect();
    let valid = octets.len() == 4
        && octets
            .iter()
            .all(|part| !part.is_empty() && part.parse::<u8>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidAddress {
            host: host.to_string(),
        })
    }
}

/// Binds the listener eagerly (an occupied port fails before any route is
/// registered), then serves `page` at the root path until ctrl-c. Each call
/// builds its own router and listener; nothing is shared between calls.
pub fn serve_page(page: String, options: &ServeOptions) -> Result<()> {
    validate_host(&options.host)?;

    let addr = options.addr();
    let listener = std::net::TcpListener::bind(&addr).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            Error::PortInUse { addr: addr.clone() }
        } else {
            Error::Io(e)
        }
    })?;
    listener.set_nonblocking(true)?;
    info!(%addr, "binding HTTP listener");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::from_std(listener)?;
        let router = Router::new().route(
            "/",
            get(move || {
                let page = page.clone();
                async move { Html(page) }
            }),
        );
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    })?;

    info!("HTTP server exited");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
