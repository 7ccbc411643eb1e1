use super::AuthProvider;
use crate::domain::Identity;

/// Environment variable holding the signed-in user's id.
pub const USER_ID_VAR: &str = "THREAD_USER_ID";

/// Environment variable holding the signed-in user's display name.
pub const AUTHOR_VAR: &str = "THREAD_AUTHOR";

/// An auth provider with a fixed answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAuth(Option<Identity>);

impl StaticAuth {
    /// Nobody is signed in.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }

    /// `identity` is signed in.
    #[must_use]
    pub const fn signed_in(identity: Identity) -> Self {
        Self(Some(identity))
    }
}

impl From<Option<Identity>> for StaticAuth {
    fn from(identity: Option<Identity>) -> Self {
        Self(identity)
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Reads the signed-in user from [`USER_ID_VAR`] and [`AUTHOR_VAR`].
///
/// Both variables must be set and non-blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAuth;

impl AuthProvider for EnvAuth {
    fn current_user(&self) -> Option<Identity> {
        let user_id = std::env::var(USER_ID_VAR).ok()?;
        let author = std::env::var(AUTHOR_VAR).ok()?;

        match Identity::new(user_id, author) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("ignoring identity from environment: {e}");
                None
            }
        }
    }
}
