use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Short-lived bearer token issued by the identity endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    issued_at: Instant,
    ttl: Duration,
}

impl Credential {
    pub fn new(token: impl Into<String>, issued_at: Instant, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            issued_at,
            ttl,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expires_at(&self) -> Instant {
        self.issued_at + self.ttl
    }

    /// Valid iff `now < issued_at + ttl`.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }
}

// Keep the token out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_expires_exactly_at_ttl() {
        let issued = Instant::now();
        let credential = Credential::new("T1", issued, Duration::from_millis(180_000));
        assert_eq!(credential.expires_at(), credential.issued_at() + credential.ttl());

        assert!(credential.is_valid_at(issued));
        assert!(credential.is_valid_at(issued + Duration::from_millis(179_999)));
        assert!(!credential.is_valid_at(issued + Duration::from_millis(180_000)));
        assert!(!credential.is_valid_at(issued + Duration::from_millis(200_000)));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let credential = Credential::new("secret-token", Instant::now(), Duration::from_secs(1));
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("secret-token"));
    }
}
