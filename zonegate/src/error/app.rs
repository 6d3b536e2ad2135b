//! Core application error type.
//!
//! `AppError` is the currency of the record store, the upstream client and
//! configuration loading. Transport-specific layers (`error::dns`,
//! `error::http`) wrap it and add the status/Rcode mapping appropriate to
//! their protocol.

pub type Result<T> = std::result::Result<T, AppError>;

/// A malformed zone-file RR line, base64 payload, or wire message.
#[derive(Debug)]
pub struct DecodeErrorStruct {
    pub decode_type: &'static str,
    pub msg: String,
}

impl DecodeErrorStruct {
    pub fn new(decode_type: &'static str, msg: impl Into<String>) -> Self {
        Self {
            decode_type,
            msg: msg.into(),
        }
    }
}

/// A record-store backend failure (Get/Set/Del).
#[derive(Debug)]
pub struct StorageErrorStruct {
    pub op: &'static str,
    pub msg: String,
}

impl StorageErrorStruct {
    pub fn new(op: &'static str, msg: impl Into<String>) -> Self {
        Self {
            op,
            msg: msg.into(),
        }
    }
}

/// Every configured upstream failed, or none were configured.
#[derive(Debug)]
pub struct UpstreamErrorStruct {
    pub last_err: String,
}

impl UpstreamErrorStruct {
    pub fn new(last_err: impl Into<String>) -> Self {
        Self {
            last_err: last_err.into(),
        }
    }
}

/// Startup-fatal configuration error.
#[derive(Debug)]
pub struct ConfigErrorStruct {
    pub msg: String,
}

impl ConfigErrorStruct {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

#[derive(Debug)]
pub enum AppError {
    Decode(DecodeErrorStruct),
    Storage(StorageErrorStruct),
    Upstream(UpstreamErrorStruct),
    Config(ConfigErrorStruct),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Decode(e) => write!(f, "failed to decode {}: {}", e.decode_type, e.msg),
            AppError::Storage(e) => write!(f, "storage {} failed: {}", e.op, e.msg),
            AppError::Upstream(e) => write!(f, "all upstreams failed: {}", e.last_err),
            AppError::Config(e) => write!(f, "invalid configuration: {}", e.msg),
            AppError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Decode(DecodeErrorStruct::new("base64", err.to_string()))
    }
}

impl From<std::string::FromUtf8Error> for AppError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AppError::Decode(DecodeErrorStruct::new("utf8", err.to_string()))
    }
}

impl From<hickory_proto::ProtoError> for AppError {
    fn from(err: hickory_proto::ProtoError) -> Self {
        AppError::Decode(DecodeErrorStruct::new("dns-message", err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Upstream(UpstreamErrorStruct::new(err.to_string()))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(UpstreamErrorStruct::new(err.to_string()))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigErrorStruct::new(err.to_string()))
    }
}
