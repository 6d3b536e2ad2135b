//! The single classifier + router every transport adapter funnels
//! through.

use hickory_proto::op::{Header, Message, ResponseCode};

use crate::config::{is_internal, Config};
use crate::dns::upstream::{self, DohMethod};
use crate::dns::internal;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
    Https,
}

/// A fresh reply carrying the request's ID, Question section and RD flag,
/// matching the standard `SetReply` pattern.
pub fn base_reply(request: &Message) -> Message {
    let mut reply = Message::new();
    reply.set_header(Header::response_from_request(request.header()));
    for query in request.queries() {
        reply.add_query(query.clone());
    }
    reply
}

/// Classify `request`'s single question, route to the internal resolver
/// or the upstream client, and normalize the result: SERVFAIL on any
/// branch error, NXDOMAIN on a branch success with an empty Answer, and
/// Authority/Additional stripped on UDP.
pub async fn dispatch(
    request: &Message,
    transport: Transport,
    method_hint: DohMethod,
    config: &Config,
    store: &dyn Store,
    http_client: &reqwest::Client,
) -> Message {
    if request.queries().is_empty() {
        let mut reply = base_reply(request);
        reply.set_response_code(ResponseCode::FormErr);
        return reply;
    }

    let raw_name = request.queries()[0].name().to_utf8();
    let name = if raw_name.ends_with('.') {
        raw_name
    } else {
        format!("{raw_name}.")
    };

    let mut reply = if is_internal(&config.service.internal_suffix, &name) {
        internal::resolve(store, request, base_reply(request)).await
    } else if config.upstream_count() > 0 {
        match upstream::query(&config.service.upstream.addrs, request, method_hint, http_client).await {
            Some(upstream_reply) => upstream_reply,
            None => {
                let mut reply = base_reply(request);
                reply.set_response_code(ResponseCode::ServFail);
                reply
            }
        }
    } else {
        let mut reply = base_reply(request);
        reply.set_response_code(ResponseCode::ServFail);
        reply
    };

    if reply.response_code() == ResponseCode::NoError && reply.answers().is_empty() {
        reply = base_reply(request);
        reply.set_response_code(ResponseCode::NXDomain);
    }

    if transport == Transport::Udp {
        reply.name_servers_mut().clear();
        reply.additionals_mut().clear();
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::record::parse_rr_line;
    use crate::store::memory::MemoryStore;
    use hickory_proto::op::{MessageType, OpCode, Query};
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;

    fn internal_config() -> Config {
        let mut config = Config::default();
        config.service.internal_suffix = vec!["dxvgef.test.".to_string()];
        config
    }

    fn query_message(name: &str, rtype: RecordType) -> Message {
        let mut message = Message::new();
        message.set_id(42);
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(Query::query(Name::from_str(name).unwrap(), rtype));
        message
    }

    #[tokio::test]
    async fn internal_hit_returns_noerror_with_answer() {
        let store = MemoryStore::new();
        store
            .set(parse_rr_line("dxvgef.test 3600 IN A 127.0.0.1").unwrap(), None)
            .await
            .unwrap();
        let config = internal_config();
        let client = reqwest::Client::new();

        let request = query_message("dxvgef.test.", RecordType::A);
        let reply = dispatch(&request, Transport::Tcp, DohMethod::Get, &config, &store, &client).await;

        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(reply.answers().len(), 1);
        assert_eq!(reply.header().id(), 42);
    }

    #[tokio::test]
    async fn internal_miss_returns_nxdomain() {
        let store = MemoryStore::new();
        let config = internal_config();
        let client = reqwest::Client::new();

        let request = query_message("missing.dxvgef.test.", RecordType::A);
        let reply = dispatch(&request, Transport::Tcp, DohMethod::Get, &config, &store, &client).await;

        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
    }

    #[tokio::test]
    async fn external_name_with_no_upstreams_is_servfail() {
        let store = MemoryStore::new();
        let config = internal_config();
        let client = reqwest::Client::new();

        let request = query_message("163.com.", RecordType::A);
        let reply = dispatch(&request, Transport::Tcp, DohMethod::Get, &config, &store, &client).await;

        assert_eq!(reply.response_code(), ResponseCode::ServFail);
    }

    #[tokio::test]
    async fn no_question_is_formerr() {
        let store = MemoryStore::new();
        let config = internal_config();
        let client = reqwest::Client::new();

        let mut request = Message::new();
        request.set_message_type(MessageType::Query);
        request.set_op_code(OpCode::Query);

        let reply = dispatch(&request, Transport::Tcp, DohMethod::Get, &config, &store, &client).await;
        assert_eq!(reply.response_code(), ResponseCode::FormErr);
    }

    #[tokio::test]
    async fn reply_echoes_id_and_recursion_desired() {
        let store = MemoryStore::new();
        let config = internal_config();
        let client = reqwest::Client::new();

        let request = query_message("missing.dxvgef.test.", RecordType::A);
        let reply = dispatch(&request, Transport::Tcp, DohMethod::Get, &config, &store, &client).await;

        assert_eq!(reply.header().id(), 42);
        assert!(reply.header().recursion_desired());
        assert_eq!(reply.queries().len(), 1);
    }
}
