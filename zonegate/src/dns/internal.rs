//! Turn a question into a store lookup and assemble the reply.

use hickory_proto::op::{Message, ResponseCode};

use crate::store::Store;

/// `request` must carry exactly one question (the dispatch core enforces
/// this before calling in).
pub async fn resolve(store: &dyn Store, request: &Message, mut reply: Message) -> Message {
    let query = &request.queries()[0];
    match store.get(&query.name().to_utf8(), query.query_class(), query.query_type()).await {
        Ok(records) if records.is_empty() => {
            reply.set_response_code(ResponseCode::NXDomain);
        }
        Ok(records) => {
            reply.set_response_code(ResponseCode::NoError);
            for record in records {
                reply.add_answer(record);
            }
        }
        Err(e) => {
            log::error!("internal resolver: store lookup failed: {e}");
            reply.set_response_code(ResponseCode::ServFail);
        }
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

    fn base_request(name: &str) -> Message {
        let mut request = Message::new();
        request.set_message_type(MessageType::Query);
        request.set_op_code(OpCode::Query);
        request.add_query(Query::query(Name::from_str(name).unwrap(), RecordType::A));
        request
    }

    #[tokio::test]
    async fn hit_adds_the_stored_record_as_an_answer() {
        let store = MemoryStore::new();
        store
            .set(parse_rr_line("dxvgef.test 3600 IN A 127.0.0.1").unwrap(), None)
            .await
            .unwrap();

        let request = base_request("dxvgef.test.");
        let reply = Message::new();
        let result = resolve(&store, &request, reply).await;

        assert_eq!(result.response_code(), ResponseCode::NoError);
        assert_eq!(result.answers().len(), 1);
    }

    #[tokio::test]
    async fn miss_is_nxdomain_with_no_answers() {
        let store = MemoryStore::new();
        let request = base_request("dxvgef.test.");
        let reply = Message::new();
        let result = resolve(&store, &request, reply).await;

        assert_eq!(result.response_code(), ResponseCode::NXDomain);
        assert!(result.answers().is_empty());
    }
}
