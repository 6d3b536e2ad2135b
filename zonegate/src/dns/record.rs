//! Zone-file textual RR parsing for the management endpoints.
//!
//! The register/delete endpoints accept records in the same one-line
//! `name ttl class type rdata` form a zone file uses (e.g.
//! `dxvgef.test 3600 IN A 127.0.0.1`). Only the RR types a small internal
//! zone realistically needs are supported; anything else is rejected as
//! malformed rather than silently dropped.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, TXT};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};

use crate::error::app::{AppError, DecodeErrorStruct};

fn malformed(msg: impl Into<String>) -> AppError {
    AppError::Decode(DecodeErrorStruct::new("rr-line", msg))
}

fn parse_name(token: &str) -> Result<Name, AppError> {
    let fqdn = if token.ends_with('.') {
        token.to_string()
    } else {
        format!("{token}.")
    };
    Name::from_str(&fqdn).map_err(|e| malformed(format!("invalid name {token:?}: {e}")))
}

/// Parse `name ttl class type rdata...` into a `Record`.
pub fn parse_rr_line(line: &str) -> Result<Record, AppError> {
    let mut tokens = line.split_whitespace();
    let name_tok = tokens.next().ok_or_else(|| malformed("empty record line"))?;
    let ttl_tok = tokens.next().ok_or_else(|| malformed("missing TTL"))?;
    let class_tok = tokens.next().ok_or_else(|| malformed("missing class"))?;
    let type_tok = tokens.next().ok_or_else(|| malformed("missing type"))?;
    let rest: Vec<&str> = tokens.collect();

    if !class_tok.eq_ignore_ascii_case("IN") {
        return Err(malformed(format!("unsupported class {class_tok:?}; only IN is supported")));
    }

    let name = parse_name(name_tok)?;
    let ttl: u32 = ttl_tok
        .parse()
        .map_err(|_| malformed(format!("invalid TTL {ttl_tok:?}")))?;

    let rdata = parse_rdata(type_tok, &rest)?;
    let mut record = Record::from_rdata(name, ttl, rdata);
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}

fn parse_rdata(type_tok: &str, rest: &[&str]) -> Result<RData, AppError> {
    let first = || rest.first().copied().ok_or_else(|| malformed("missing rdata"));

    match type_tok.to_ascii_uppercase().as_str() {
        "A" => {
            let addr: Ipv4Addr = first()?
                .parse()
                .map_err(|_| malformed(format!("invalid A rdata {:?}", rest.join(" "))))?;
            Ok(RData::A(A(addr)))
        }
        "AAAA" => {
            let addr: Ipv6Addr = first()?
                .parse()
                .map_err(|_| malformed(format!("invalid AAAA rdata {:?}", rest.join(" "))))?;
            Ok(RData::AAAA(AAAA(addr)))
        }
        "CNAME" => Ok(RData::CNAME(CNAME(parse_name(first()?)?))),
        "NS" => Ok(RData::NS(NS(parse_name(first()?)?))),
        "PTR" => Ok(RData::PTR(PTR(parse_name(first()?)?))),
        "MX" => {
            if rest.len() < 2 {
                return Err(malformed("MX rdata requires a preference and an exchange"));
            }
            let preference: u16 = rest[0]
                .parse()
                .map_err(|_| malformed(format!("invalid MX preference {:?}", rest[0])))?;
            let exchange = parse_name(rest[1])?;
            Ok(RData::MX(MX::new(preference, exchange)))
        }
        "TXT" => {
            if rest.is_empty() {
                return Err(malformed("TXT rdata must not be empty"));
            }
            let text = rest.join(" ");
            let text = text.trim_matches('"');
            Ok(RData::TXT(TXT::new(vec![text.to_string()])))
        }
        other => Err(malformed(format!("unsupported record type {other:?}"))),
    }
}

pub fn rrtype_name(rtype: RecordType) -> String {
    rtype.to_string()
}
