use serde::{Deserialize, Serialize};

/// True when `email` is on the allowlist. Comparison ignores case and
/// surrounding whitespace.
pub fn is_admin(email: &str, allowlist: &[String]) -> bool {
    let email = email.trim();
    !email.is_empty()
        && allowlist
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(email))
}

/// The signed-in user as handed over by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Passed explicitly to every view that needs to know who is signed in.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionContext {
    user: Option<AuthenticatedUser>,
    is_admin: bool,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: AuthenticatedUser, admin_allowlist: &[String]) -> Self {
        let is_admin = is_admin(&user.email, admin_allowlist);
        if is_admin {
            tracing::debug!("Admin session for {}", user.email);
        }
        Self {
            user: Some(user),
            is_admin,
        }
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn display_name(&self) -> &str {
        match &self.user {
            Some(user) => user.full_name.as_deref().unwrap_or(&user.email),
            None => "",
        }
    }
}
