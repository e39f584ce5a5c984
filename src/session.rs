use crate::config::{StoreConfig, ENV_ACCESS_TOKEN};
use crate::store::StoreError;

/// Access token of a user signed in through the hosted auth flow.
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Session {
    pub fn from_token(token: &str) -> Result<Self, StoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StoreError::MissingSession);
        }
        Ok(Self {
            access_token: token.to_string(),
        })
    }

    /// Token from the store config, else from `RACE_TRACKER_ACCESS_TOKEN`.
    pub fn resolve(config: &StoreConfig) -> Result<Self, StoreError> {
        if !config.access_token.trim().is_empty() {
            return Self::from_token(&config.access_token);
        }
        let token = std::env::var(ENV_ACCESS_TOKEN).unwrap_or_default();
        Self::from_token(&token)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{StoreConfig, ENV_ACCESS_TOKEN};
    use crate::session::Session;
    use crate::store::StoreError;

    #[test]
    fn blank_token_means_no_session() {
        assert!(matches!(
            Session::from_token("   "),
            Err(StoreError::MissingSession)
        ));
    }

    #[test]
    fn resolve_prefers_configured_token() {
        let config = StoreConfig {
            access_token: " jwt-from-config ".to_string(),
            ..StoreConfig::default()
        };
        let session = Session::resolve(&config).expect("configured token");
        assert_eq!(session.bearer(), "Bearer jwt-from-config");
    }

    #[test]
    fn resolve_without_any_token_is_missing_session() {
        if std::env::var(ENV_ACCESS_TOKEN).is_ok() {
            return;
        }
        let result = Session::resolve(&StoreConfig::default());
        assert!(matches!(result, Err(StoreError::MissingSession)));
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::from_token("secret-jwt").expect("token should be accepted");
        assert_eq!(session.bearer(), "Bearer secret-jwt");
        assert!(!format!("{session:?}").contains("secret-jwt"));
    }
}
