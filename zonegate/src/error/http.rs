//! HTTP-path error type: the full nine-kind taxonomy, each carrying the
//! status code it maps to.

use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{HttpResponse, HttpResponseBuilder};

use super::app::AppError;

#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    UnsupportedMediaType,
    Internal(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::BadRequest(msg) => write!(f, "{msg}"),
            HttpError::Unauthorized => write!(f, "unauthorized"),
            HttpError::Forbidden => write!(f, "name is not part of the internal zone"),
            HttpError::NotFound => write!(f, "not found"),
            HttpError::MethodNotAllowed => write!(f, "method not allowed"),
            HttpError::Conflict => write!(f, "record already exists"),
            HttpError::UnsupportedMediaType => write!(f, "unsupported content type"),
            HttpError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl actix_web::error::ResponseError for HttpError {
    fn status_code(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden => StatusCode::FORBIDDEN,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::Conflict => StatusCode::CONFLICT,
            HttpError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("{self}");
        HttpResponseBuilder::new(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::ResponseError;
    use crate::error::app::{DecodeErrorStruct, StorageErrorStruct};

    #[test]
    fn decode_error_maps_to_bad_request() {
        let err: HttpError = AppError::Decode(DecodeErrorStruct::new("rr-line", "bad line")).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_error_maps_to_internal_server_error() {
        let err: HttpError = AppError::Storage(StorageErrorStruct::new("get", "unavailable")).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn each_variant_keeps_its_declared_status() {
        assert_eq!(HttpError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(HttpError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(HttpError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            HttpError::UnsupportedMediaType.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        log::error!("{err}");
        match err {
            AppError::Decode(e) => HttpError::BadRequest(e.msg),
            AppError::Storage(e) => HttpError::Internal(e.msg),
            AppError::Upstream(e) => HttpError::Internal(e.last_err),
            AppError::Config(e) => HttpError::Internal(e.msg),
            AppError::Internal(msg) => HttpError::Internal(msg),
        }
    }
}
