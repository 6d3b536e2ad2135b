pub mod dns_server;
pub mod dot;
pub mod http;
