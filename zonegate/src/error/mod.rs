pub mod app;
pub mod dns;
pub mod http;

pub use app::AppError;
pub use dns::DnsError;
pub use http::HttpError;
