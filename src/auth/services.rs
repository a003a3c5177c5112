use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, LoginResponse},
    jwt::JwtKeys,
    password::verify_password_blocking,
};
use crate::{
    errors::{AppError, AppResult},
    users::{repo::UserRepository, repo_types::User},
};

/// Why a bearer credential was refused. All map to 401 with distinct messages.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("Authentication token missing")]
    Missing,
    #[error("Wrong authentication token")]
    Invalid,
    #[error("User no longer exists")]
    UserGone,
}

impl From<AuthRejection> for AppError {
    fn from(r: AuthRejection) -> Self {
        AppError::Unauthorized(r.to_string())
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    /// Verifies `token` and loads the user it names. Stateless: nothing is
    /// cached between requests.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AuthRejection::Invalid
        })?;

        match self.users.find_by_id(claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %claims.sub, "token for removed user");
                Err(AuthRejection::UserGone.into())
            }
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginRequest) -> AppResult<LoginResponse> {
        let Some(user) = self.users.find_by_email(&input.email).await? else {
            warn!("login unknown email");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        };

        if !verify_password_blocking(input.password, user.password.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            token,
            expires_in: self.keys.ttl().as_secs(),
            user: user.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: Uuid) -> AppResult<User> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User doesn't exist".into()))?;
        info!(user_id = %user.id, "user logged out");
        Ok(user)
    }

    pub fn login_cookie(&self, token: &str) -> String {
        format!(
            "Authorization={token}; HttpOnly; Path=/; Max-Age={}",
            self.keys.ttl().as_secs()
        )
    }

    pub fn logout_cookie() -> &'static str {
        "Authorization=; HttpOnly; Path=/; Max-Age=0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password::hash_password,
        config::JwtConfig,
        users::{
            repo::memory::InMemoryUserRepository,
            repo_types::NewUser,
        },
    };

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
        })
    }

    async fn seeded() -> (AuthService, Arc<InMemoryUserRepository>, User) {
        let repo = Arc::new(InMemoryUserRepository::default());
        let user = repo
            .create(NewUser {
                email: "login@example.com".into(),
                password_hash: hash_password("password123").unwrap(),
                first_name: "John".into(),
                last_name: "Doe".into(),
                phone_number: None,
                image: None,
            })
            .await
            .unwrap();
        (AuthService::new(repo.clone(), keys()), repo, user)
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_issues_token_that_authenticates() {
        let (svc, _, user) = seeded().await;
        let res = svc.login(login("login@example.com", "password123")).await.unwrap();
        assert_eq!(res.user.id, user.id);
        assert_eq!(res.expires_in, 3600);

        let resolved = svc.authenticate(&res.token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn login_rejects_unknown_email_and_wrong_password() {
        let (svc, _, _) = seeded().await;
        let unknown = svc.login(login("nobody@example.com", "password123")).await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
        let wrong = svc.login(login("login@example.com", "incorrect")).await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn authenticate_distinguishes_invalid_token_from_removed_user() {
        let (svc, repo, user) = seeded().await;

        let invalid = svc.authenticate("garbage").await.unwrap_err();
        assert_eq!(invalid.to_string(), AuthRejection::Invalid.to_string());

        let token = keys().sign(user.id).unwrap();
        repo.delete(user.id).await.unwrap();
        let gone = svc.authenticate(&token).await.unwrap_err();
        assert_eq!(gone.to_string(), AuthRejection::UserGone.to_string());
    }

    #[tokio::test]
    async fn logout_resolves_user_or_not_found() {
        let (svc, _, user) = seeded().await;
        assert_eq!(svc.logout(user.id).await.unwrap().email, user.email);
        assert!(matches!(
            svc.logout(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn cookies_carry_ttl_and_clear() {
        let svc = AuthService::new(Arc::new(InMemoryUserRepository::default()), keys());
        let cookie = svc.login_cookie("abc");
        assert!(cookie.starts_with("Authorization=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(AuthService::logout_cookie().contains("Max-Age=0"));
    }
}
