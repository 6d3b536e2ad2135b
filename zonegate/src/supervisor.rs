//! Start every listener whose port is configured, refuse to start with
//! nothing to serve, and drain within a bounded deadline on shutdown
//! signal.

use std::sync::Arc;
use std::time::Duration;

use hickory_server::ServerFuture;
use tokio::net::{TcpListener, UdpSocket};

use crate::state::AppState;
use crate::transport::{dns_server::DnsHandler, dot, http};

pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    let cfg = state.config.clone();

    if !cfg.has_internal_zone() && cfg.upstream_count() == 0 {
        log::error!("neither an internal zone nor any upstream is configured; nothing to serve");
        std::process::exit(1);
    }

    let ip = if cfg.service.ip.is_empty() {
        "0.0.0.0"
    } else {
        cfg.service.ip.as_str()
    };

    let mut dns_server = None;
    if cfg.service.udp.port > 0 || cfg.service.tcp.port > 0 || cfg.service.tls.port > 0 {
        let mut server: ServerFuture<DnsHandler> = ServerFuture::new(DnsHandler::new(state.clone()));

        if cfg.service.udp.port > 0 {
            let addr = format!("{ip}:{}", cfg.service.udp.port);
            let socket = UdpSocket::bind(&addr).await?;
            server.register_socket(socket);
            log::info!("udp listener enabled on {addr}");
        } else {
            log::info!("udp listener disabled (service.udp.port not set)");
        }

        if cfg.service.tcp.port > 0 {
            let addr = format!("{ip}:{}", cfg.service.tcp.port);
            let listener = TcpListener::bind(&addr).await?;
            server.register_listener(listener, Duration::from_secs(10));
            log::info!("tcp listener enabled on {addr}");
        } else {
            log::info!("tcp listener disabled (service.tcp.port not set)");
        }

        if cfg.service.tls.port > 0 {
            let addr = format!("{ip}:{}", cfg.service.tls.port);
            let listener = TcpListener::bind(&addr).await?;
            let (certs, key) = dot::load_certs_and_key(&cfg.service.tls.cert_file, &cfg.service.tls.key_file)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            server
                .register_tls_listener(listener, Duration::from_secs(10), (certs, key))
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            log::info!("dns-over-tls listener enabled on {addr}");
        } else {
            log::info!("dns-over-tls listener disabled (service.tls.port not set)");
        }

        dns_server = Some(server);
    } else {
        log::info!("no udp/tcp/tls port configured; dns listeners disabled");
    }

    let http_handle = if cfg.service.http.port > 0 {
        let addr = format!("{ip}:{}", cfg.service.http.port);
        log::info!("http listener enabled on {addr}");
        Some(tokio::spawn(http::serve_plain(state.clone(), addr)))
    } else {
        log::info!("http listener disabled (service.http.port not set)");
        None
    };

    let https_handle = if cfg.service.http.ssl_port > 0 {
        let addr = format!("{ip}:{}", cfg.service.http.ssl_port);
        let tls_config = dot::load_server_config(&cfg.service.http.cert_file, &cfg.service.http.key_file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        log::info!("https listener enabled on {addr}");
        Some(tokio::spawn(http::serve_tls(state.clone(), addr, tls_config)))
    } else {
        log::info!("https listener disabled (service.http.sslPort not set)");
        None
    };

    tokio::signal::ctrl_c().await?;
    log::info!(
        "shutdown signal received, draining within {}s",
        cfg.service.quit_wait_timeout
    );
    let deadline = Duration::from_secs(cfg.service.quit_wait_timeout.max(1));

    if let Some(mut server) = dns_server {
        match tokio::time::timeout(deadline, server.shutdown_gracefully()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("dns listener shutdown error: {e}"),
            Err(_) => log::warn!("dns listener shutdown deadline exceeded"),
        }
    }

    if let Some(handle) = http_handle {
        handle.abort();
    }
    if let Some(handle) = https_handle {
        handle.abort();
    }

    Ok(())
}
