//! Forward a wire-format query to the first of N configured upstreams
//! that answers successfully.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::TlsConnector;

use crate::error::app::{self, AppError, UpstreamErrorStruct};

/// Which DoH method to use against `https://` upstreams, chosen to mirror
/// the method the inbound client used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DohMethod {
    Get,
    Post,
}

const UDP_TCP_DEADLINE: Duration = Duration::from_secs(3);
const DOH_DEADLINE: Duration = Duration::from_secs(5);

/// Try every upstream in order; return the first successful reply. An
/// empty list, or every upstream failing, yields `None`; the dispatch
/// core treats that as SERVFAIL.
pub async fn query(
    addrs: &[String],
    request: &Message,
    method_hint: DohMethod,
    http_client: &reqwest::Client,
) -> Option<Message> {
    let packed = match request.to_bytes() {
        Ok(b) => b,
        Err(e) => {
            log::error!("failed to pack upstream request: {e}");
            return None;
        }
    };

    let mut last_err = None;
    for addr in addrs {
        match dispatch_one(addr, &packed, method_hint, http_client).await {
            Ok(reply) => return Some(reply),
            Err(e) => {
                log::warn!("upstream {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    if let Some(e) = last_err {
        log::error!("all upstreams exhausted, last error: {e}");
    }
    None
}

async fn dispatch_one(
    addr: &str,
    packed: &[u8],
    method_hint: DohMethod,
    http_client: &reqwest::Client,
) -> app::Result<Message> {
    if let Some(host) = addr.strip_prefix("udp://") {
        query_udp(host, packed).await
    } else if let Some(host) = addr.strip_prefix("tcp://") {
        query_tcp(host, packed).await
    } else if let Some(host) = addr.strip_prefix("tls://") {
        query_tls(host, packed).await
    } else if addr.starts_with("https://") {
        query_doh(addr, packed, method_hint, http_client).await
    } else {
        Err(AppError::Upstream(UpstreamErrorStruct::new(format!(
            "unsupported upstream scheme: {addr}"
        ))))
    }
}

async fn query_udp(host: &str, packed: &[u8]) -> app::Result<Message> {
    tokio::time::timeout(UDP_TCP_DEADLINE, async {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(host).await?;
        socket.send(packed).await?;
        let mut buf = vec![0u8; 4096];
        let n = socket.recv(&mut buf).await?;
        buf.truncate(n);
        Ok::<Vec<u8>, std::io::Error>(buf)
    })
    .await
    .map_err(|_| AppError::Upstream(UpstreamErrorStruct::new(format!("udp exchange with {host} timed out"))))??
    .pipe_decode()
}

async fn query_tcp(host: &str, packed: &[u8]) -> app::Result<Message> {
    tokio::time::timeout(UDP_TCP_DEADLINE, async {
        let mut stream = TcpStream::connect(host).await?;
        write_framed(&mut stream, packed).await?;
        read_framed(&mut stream).await
    })
    .await
    .map_err(|_| AppError::Upstream(UpstreamErrorStruct::new(format!("tcp exchange with {host} timed out"))))??
    .pipe_decode()
}

async fn query_tls(host: &str, packed: &[u8]) -> app::Result<Message> {
    tokio::time::timeout(UDP_TCP_DEADLINE, async {
        let server_name = host
            .rsplit_once(':')
            .map(|(h, _)| h)
            .unwrap_or(host)
            .to_string();

        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let client_config = rustls::ClientConfig::builder_with_protocol_versions(&[&rustls::version::TLS13])
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(std::sync::Arc::new(client_config));

        let tcp = TcpStream::connect(host).await?;
        let dns_name = rustls::pki_types::ServerName::try_from(server_name)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        let mut tls = connector.connect(dns_name, tcp).await?;
        write_framed(&mut tls, packed).await?;
        read_framed(&mut tls).await
    })
    .await
    .map_err(|_| AppError::Upstream(UpstreamErrorStruct::new(format!("dot exchange with {host} timed out"))))??
    .pipe_decode()
}

async fn write_framed<W: tokio::io::AsyncWrite + Unpin>(w: &mut W, packed: &[u8]) -> std::io::Result<()> {
    let len = u16::try_from(packed.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "message too large for TCP framing"))?;
    w.write_all(&len.to_be_bytes()).await?;
    w.write_all(packed).await?;
    w.flush().await
}

async fn read_framed<R: tokio::io::AsyncRead + Unpin>(r: &mut R) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    r.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn query_doh(
    addr: &str,
    packed: &[u8],
    method_hint: DohMethod,
    http_client: &reqwest::Client,
) -> app::Result<Message> {
    let response = tokio::time::timeout(DOH_DEADLINE, async {
        match method_hint {
            DohMethod::Get => {
                let encoded = URL_SAFE_NO_PAD.encode(packed);
                let sep = if addr.contains('?') { '&' } else { '?' };
                let url = format!("{addr}{sep}dns={encoded}");
                http_client.get(url).send().await
            }
            DohMethod::Post => {
                http_client
                    .post(addr)
                    .header("Content-Type", "application/dns-message")
                    .header("Accept", "application/dns-message")
                    .body(packed.to_vec())
                    .send()
                    .await
            }
        }
    })
    .await
    .map_err(|_| AppError::Upstream(UpstreamErrorStruct::new(format!("doh exchange with {addr} timed out"))))??;

    if response.status() != reqwest::StatusCode::OK {
        return Err(AppError::Upstream(UpstreamErrorStruct::new(format!(
            "doh upstream {addr} returned {}",
            response.status()
        ))));
    }

    let body = response.bytes().await?;
    Message::from_bytes(&body).map_err(AppError::from)
}

trait DecodeExt {
    fn pipe_decode(self) -> app::Result<Message>;
}

impl DecodeExt for Vec<u8> {
    fn pipe_decode(self) -> app::Result<Message> {
        Message::from_bytes(&self).map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let client = reqwest::Client::new();
        let packed = vec![0u8; 12];
        let err = dispatch_one("ftp://example.test", &packed, DohMethod::Get, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn length_prefixed_framing_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let payload = b"a wire-format dns message".to_vec();
        write_framed(&mut a, &payload).await.unwrap();
        let received = read_framed(&mut b).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn query_returns_none_for_empty_upstream_list() {
        let client = reqwest::Client::new();
        let request = hickory_proto::op::Message::new();
        let reply = query(&[], &request, DohMethod::Get, &client).await;
        assert!(reply.is_none());
    }
}
