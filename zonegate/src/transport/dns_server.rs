//! UDP, TCP and DoT listeners, sharing one handler.
//!
//! Three near-identical listeners differing only in network family; all
//! three funnel through [`DnsHandler`], which does nothing but adapt a
//! `hickory_server::server::Request` into the protocol-neutral message
//! [`dispatch::dispatch`] expects and write the reply back out.

use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Header, Message, ResponseCode};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Protocol, Request, RequestHandler, ResponseHandler, ResponseInfo};

use crate::dns::dispatch::{self, Transport};
use crate::dns::upstream::DohMethod;
use crate::error::DnsError;
use crate::state::AppState;

pub struct DnsHandler {
    state: Arc<AppState>,
}

impl DnsHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn transport_of(request: &Request) -> Transport {
        match request.protocol() {
            Protocol::Udp => Transport::Udp,
            Protocol::Tcp => Transport::Tcp,
            Protocol::Tls => Transport::Tls,
            _ => Transport::Tcp,
        }
    }

    /// `Request` already holds a decoded message; reconstruct the
    /// protocol-neutral `Message` the dispatch core operates on from its
    /// header and (single) question.
    fn to_message(request: &Request) -> Message {
        let mut message = Message::new();
        message.set_header(*request.header());
        for query in request.queries() {
            message.add_query(query.original().clone());
        }
        message
    }
}

#[async_trait]
impl RequestHandler for DnsHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handler: R,
    ) -> ResponseInfo {
        let transport = Self::transport_of(request);
        let message = Self::to_message(request);

        let reply = dispatch::dispatch(
            &message,
            transport,
            DohMethod::Get,
            &self.state.config,
            self.state.store.as_ref(),
            &self.state.http_client,
        )
        .await;

        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(
            *reply.header(),
            reply.answers().iter(),
            reply.name_servers().iter(),
            &[],
            reply.additionals().iter(),
        );

        match response_handler.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                let err = DnsError::from(e);
                log::error!("{err}");
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
