// ── Credentials for the device and for local privileged probing ─────────────

use secrecy::{ExposeSecret, SecretString};

/// Login for the remote device plus the optional local sudo password.
///
/// The privileged secret is only needed when a cached address has to be
/// verified, because the targeted probe runs under `sudo`.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    password: SecretString,
    privileged_secret: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
            privileged_secret: None,
        }
    }

    pub fn with_privileged_secret(mut self, secret: impl Into<String>) -> Self {
        self.privileged_secret = Some(SecretString::new(secret.into()));
        self
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub fn privileged_secret(&self) -> Option<&SecretString> {
        self.privileged_secret.as_ref()
    }

    pub fn has_privileged_secret(&self) -> bool {
        self.privileged_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::new("pi", "raspberry").with_privileged_secret("hunter2");
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("pi"));
        assert!(!dbg.contains("raspberry"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn privileged_secret_is_optional() {
        let creds = Credentials::new("pi", "raspberry");
        assert!(!creds.has_privileged_secret());
        assert_eq!(creds.password(), "raspberry");
        let creds = creds.with_privileged_secret("hunter2");
        assert_eq!(
            creds.privileged_secret().map(|s| s.expose_secret().as_str()),
            Some("hunter2")
        );
    }
}
