//! Credential records cached per host.

/// Credentials for one host: what we will present when connecting, and
/// whether a connection has actually succeeded with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    /// True once a connection has been established with these credentials.
    pub verified: bool,
}

impl Credentials {
    pub fn new(user: Option<String>, password: Option<String>) -> Self {
        Self {
            user,
            password,
            verified: false,
        }
    }

    /// True when neither user nor password is set.
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty_and_unverified() {
        let creds = Credentials::default();
        assert!(creds.is_empty());
        assert!(!creds.verified);
    }

    #[test]
    fn test_new_is_unverified() {
        let creds = Credentials::new(Some("root".into()), None);
        assert!(!creds.is_empty());
        assert!(!creds.verified);
    }
}
