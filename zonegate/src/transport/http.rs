//! DoH wire (GET/POST), DoH JSON (GET), and the register/delete
//! management endpoints, all on one `actix-web` server (and its optional
//! TLS twin).

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::http::header::ContentType;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use serde::Serialize;
use std::str::FromStr;
use tracing_actix_web::TracingLogger;

use crate::config::is_internal;
use crate::dns::dispatch::{self, Transport};
use crate::dns::record::parse_rr_line;
use crate::dns::upstream::DohMethod;
use crate::error::http::HttpError;
use crate::state::AppState;

type Data = web::Data<Arc<AppState>>;

fn check_auth(req: &HttpRequest, enabled: bool, expected: &str) -> Result<(), HttpError> {
    if !enabled {
        return Ok(());
    }
    let got = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if got == expected {
        Ok(())
    } else {
        Err(HttpError::Unauthorized)
    }
}

async fn dns_query_get(req: HttpRequest, data: Data) -> Result<HttpResponse, HttpError> {
    check_auth(&req, data.config.service.http.dns_query_auth, &data.config.service.http.authorization)?;
    let query = req.query_string();
    let params: HashMap<String, String> = web::Query::<HashMap<String, String>>::from_query(query)
        .map_err(|_| HttpError::BadRequest("malformed query string".into()))?
        .into_inner();
    let encoded = params
        .get("dns")
        .ok_or_else(|| HttpError::BadRequest("missing dns parameter".into()))?;
    let packed = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| HttpError::BadRequest(format!("invalid base64: {e}")))?;
    handle_wire(&packed, DohMethod::Get, &data).await
}

async fn dns_query_post(req: HttpRequest, body: web::Bytes, data: Data) -> Result<HttpResponse, HttpError> {
    check_auth(&req, data.config.service.http.dns_query_auth, &data.config.service.http.authorization)?;
    handle_wire(&body, DohMethod::Post, &data).await
}

async fn handle_wire(packed: &[u8], method_hint: DohMethod, data: &Data) -> Result<HttpResponse, HttpError> {
    let request = Message::from_bytes(packed).map_err(|e| HttpError::BadRequest(format!("malformed dns message: {e}")))?;
    let reply = dispatch::dispatch(
        &request,
        Transport::Https,
        method_hint,
        &data.config,
        data.store.as_ref(),
        &data.http_client,
    )
    .await;
    let out = reply
        .to_bytes()
        .map_err(|e| HttpError::Internal(format!("failed to pack reply: {e}")))?;
    Ok(HttpResponse::Ok()
        .content_type("application/dns-message")
        .body(out))
}

#[derive(Serialize)]
struct JsonRr {
    name: String,
    #[serde(rename = "type")]
    rtype: u16,
    #[serde(rename = "TTL")]
    ttl: u32,
    data: String,
}

#[derive(Serialize)]
struct JsonResponse {
    #[serde(rename = "Status")]
    status: u16,
    #[serde(rename = "TC")]
    tc: bool,
    #[serde(rename = "RD")]
    rd: bool,
    #[serde(rename = "RA")]
    ra: bool,
    #[serde(rename = "AD")]
    ad: bool,
    #[serde(rename = "CD")]
    cd: bool,
    #[serde(rename = "Question")]
    question: Vec<JsonRr>,
    #[serde(rename = "Answer", skip_serializing_if = "Vec::is_empty")]
    answer: Vec<JsonRr>,
    #[serde(rename = "Authority", skip_serializing_if = "Vec::is_empty")]
    authority: Vec<JsonRr>,
    #[serde(rename = "Extra", skip_serializing_if = "Vec::is_empty")]
    extra: Vec<JsonRr>,
}

fn to_json_rr(record: &hickory_proto::rr::Record) -> JsonRr {
    JsonRr {
        name: record.name().to_utf8(),
        rtype: u16::from(record.record_type()),
        ttl: record.ttl(),
        data: record.data().map(ToString::to_string).unwrap_or_default(),
    }
}

async fn json_query(req: HttpRequest, data: Data) -> Result<HttpResponse, HttpError> {
    check_auth(&req, data.config.service.http.json_query_auth, &data.config.service.http.authorization)?;
    let query = req.query_string();
    let params: HashMap<String, String> = web::Query::<HashMap<String, String>>::from_query(query)
        .map_err(|_| HttpError::BadRequest("malformed query string".into()))?
        .into_inner();
    let name_param = params
        .get("name")
        .ok_or_else(|| HttpError::BadRequest("missing name parameter".into()))?;
    let type_param = params.get("type").map(String::as_str).unwrap_or("A");

    let fqdn = if name_param.ends_with('.') {
        name_param.clone()
    } else {
        format!("{name_param}.")
    };
    let name = Name::from_str(&fqdn).map_err(|e| HttpError::BadRequest(format!("invalid name: {e}")))?;
    let rtype = RecordType::from_str(&type_param.to_ascii_uppercase())
        .map_err(|e| HttpError::BadRequest(format!("invalid type: {e}")))?;

    let mut request = Message::new();
    request.set_id(0);
    request.set_message_type(MessageType::Query);
    request.set_op_code(OpCode::Query);
    request.set_recursion_desired(true);
    request.add_query(Query::query(name, rtype));

    let reply = dispatch::dispatch(
        &request,
        Transport::Https,
        DohMethod::Get,
        &data.config,
        data.store.as_ref(),
        &data.http_client,
    )
    .await;

    let header = reply.header();
    let body = JsonResponse {
        status: u16::from(header.response_code()),
        tc: header.truncated(),
        rd: header.recursion_desired(),
        ra: header.recursion_available(),
        ad: header.authentic_data(),
        cd: header.checking_disabled(),
        question: reply
            .queries()
            .iter()
            .map(|q| JsonRr {
                name: q.name().to_utf8(),
                rtype: u16::from(q.query_type()),
                ttl: 0,
                data: String::new(),
            })
            .collect(),
        answer: reply.answers().iter().map(to_json_rr).collect(),
        authority: reply.name_servers().iter().map(to_json_rr).collect(),
        extra: reply.additionals().iter().map(to_json_rr).collect(),
    };

    Ok(HttpResponse::Ok().json(body))
}

async fn register(req: HttpRequest, body: web::Bytes, data: Data) -> Result<HttpResponse, HttpError> {
    check_auth(&req, data.config.service.http.register_auth, &data.config.service.http.authorization)?;

    let content_type = req
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/x-www-form-urlencoded") {
        return Err(HttpError::UnsupportedMediaType);
    }

    let rr = url::form_urlencoded::parse(&body)
        .find(|(key, _)| key == "rr")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| HttpError::BadRequest("missing rr field".into()))?;

    let record = parse_rr_line(&rr)?;
    let name = record.name().to_utf8();
    if !is_internal(&data.config.service.internal_suffix, &name) {
        return Err(HttpError::Forbidden);
    }

    let create_only = req.method() == actix_web::http::Method::POST;
    if create_only {
        let existing = data
            .store
            .get(&name, record.dns_class(), record.record_type())
            .await?;
        if !existing.is_empty() {
            return Err(HttpError::Conflict);
        }
    }

    let ttl = data.config.storage.use_expire.then_some(record.ttl() as u64);
    data.store.set(record, ttl).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn delete(req: HttpRequest, data: Data) -> Result<HttpResponse, HttpError> {
    check_auth(&req, data.config.service.http.delete_auth, &data.config.service.http.authorization)?;

    let query = req.query_string();
    let params: HashMap<String, String> = web::Query::<HashMap<String, String>>::from_query(query)
        .map_err(|_| HttpError::BadRequest("malformed query string".into()))?
        .into_inner();
    let encoded = params
        .get("rr")
        .ok_or_else(|| HttpError::BadRequest("missing rr parameter".into()))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| HttpError::BadRequest(format!("invalid base64: {e}")))?;
    let text = String::from_utf8(decoded).map_err(|e| HttpError::BadRequest(format!("invalid utf8: {e}")))?;

    let record = parse_rr_line(&text)?;
    let name = record.name().to_utf8();
    if !is_internal(&data.config.service.internal_suffix, &name) {
        return Err(HttpError::Forbidden);
    }

    data.store.del(&record).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type(ContentType::plaintext())
        .body("not found")
}

pub fn configure(cfg: &mut web::ServiceConfig, state: Arc<AppState>) {
    let http = state.config.service.http.clone();
    cfg.app_data(web::Data::new(state));

    if !http.dns_query_path.is_empty() {
        cfg.service(
            web::resource(&http.dns_query_path)
                .route(web::get().to(dns_query_get))
                .route(web::post().to(dns_query_post)),
        );
    }
    if !http.json_query_path.is_empty() {
        cfg.service(web::resource(&http.json_query_path).route(web::get().to(json_query)));
    }
    if !http.register_path.is_empty() {
        cfg.service(
            web::resource(&http.register_path)
                .route(web::post().to(register))
                .route(web::put().to(register)),
        );
    }
    if !http.delete_path.is_empty() {
        cfg.service(web::resource(&http.delete_path).route(web::delete().to(delete)));
    }
    cfg.default_service(web::route().to(not_found));
}

pub async fn serve_plain(state: Arc<AppState>, bind_addr: String) -> std::io::Result<()> {
    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(|cfg| configure(cfg, server_state.clone()))
    })
    .bind(bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn check_auth_passes_through_when_disabled() {
        let req = TestRequest::default().to_http_request();
        assert!(check_auth(&req, false, "123456").is_ok());
    }

    #[test]
    fn check_auth_rejects_missing_header_when_enabled() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(check_auth(&req, true, "123456"), Err(HttpError::Unauthorized)));
    }

    #[test]
    fn check_auth_rejects_wrong_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "wrong"))
            .to_http_request();
        assert!(matches!(check_auth(&req, true, "123456"), Err(HttpError::Unauthorized)));
    }

    #[test]
    fn check_auth_accepts_matching_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "123456"))
            .to_http_request();
        assert!(check_auth(&req, true, "123456").is_ok());
    }
}

pub async fn serve_tls(
    state: Arc<AppState>,
    bind_addr: String,
    tls_config: rustls::ServerConfig,
) -> std::io::Result<()> {
    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(|cfg| configure(cfg, server_state.clone()))
    })
    .bind_rustls_0_23(bind_addr, tls_config)?
    .run()
    .await
}
