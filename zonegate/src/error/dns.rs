//! DNS-path error type.
//!
//! `dispatch::dispatch` never returns an error: every branch failure is
//! already folded into a Rcode before the reply leaves the dispatch core
//! (the dispatch pseudocode does this inline). The one remaining fallible
//! operation at the transport boundary is writing the reply back out over
//! the wire; this type exists for that.

#[derive(Debug)]
pub struct DnsError(pub std::io::Error);

impl std::fmt::Display for DnsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to write dns response: {}", self.0)
    }
}

impl std::error::Error for DnsError {}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failed_operation() {
        let err: DnsError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(err.to_string().starts_with("failed to write dns response"));
    }
}
