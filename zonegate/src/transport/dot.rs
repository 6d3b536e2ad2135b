//! TLS material loading shared by the DoT and HTTPS listeners.

use std::fs::File;
use std::io::BufReader;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::app::{self, AppError, ConfigErrorStruct};

pub fn load_server_config(cert_file: &str, key_file: &str) -> app::Result<rustls::ServerConfig> {
    let certs = load_certs(cert_file)?;
    let key = load_key(key_file)?;
    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("invalid TLS certificate/key: {e}"))))
}

/// Same cert/key material in the raw form `ServerFuture::register_tls_listener`
/// wants, for the DoT listener.
pub fn load_certs_and_key(
    cert_file: &str,
    key_file: &str,
) -> app::Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    Ok((load_certs(cert_file)?, load_key(key_file)?))
}

fn load_certs(path: &str) -> app::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("cannot open cert file {path}: {e}"))))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("cannot parse cert file {path}: {e}"))))
}

fn load_key(path: &str) -> app::Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("cannot open key file {path}: {e}"))))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| AppError::Config(ConfigErrorStruct::new(format!("cannot parse key file {path}: {e}"))))?
        .ok_or_else(|| AppError::Config(ConfigErrorStruct::new(format!("no private key found in {path}"))))
}
