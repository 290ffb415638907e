use url::Url;

/// Formats the Authorization header value for a bearer token.
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Resolves an action's `apiUrl`, which may be absolute or relative to the portal.
pub fn resolve_action_url(base: &Url, target: &str) -> Result<Url, url::ParseError> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(target),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        assert_eq!(bearer_header("T1"), "Bearer T1");
    }

    #[test]
    fn test_resolve_action_url() {
        let base = Url::parse("https://portal.example.edu/").unwrap();

        assert_eq!(
            resolve_action_url(&base, "/NotificationPortlet/api/v2/action/1/read").unwrap().as_str(),
            "https://portal.example.edu/NotificationPortlet/api/v2/action/1/read"
        );
        assert_eq!(
            resolve_action_url(&base, "https://other.example.edu/x").unwrap().as_str(),
            "https://other.example.edu/x"
        );
        assert!(resolve_action_url(&base, "http://[::1").is_err());
    }
}
