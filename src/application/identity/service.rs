//! User management service: application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::places::{Compensation, CompensationLog};
use crate::application::ports::{ImageStore, ImageUpload};
use crate::domain::{CreateUserDto, DomainError, DomainResult, RepositoryProvider, User};
use crate::infrastructure::crypto::{create_token, hash_password, verify_password, JwtConfig};
use crate::shared::{with_timeout, CallTimeouts};

const USER_EXISTS: &str = "User already exists.";
const INVALID_CREDENTIALS: &str = "Invalid credentials, login failed.";

/// Authentication result returned after signup or login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Input for [`UserService::signup`]. Fields are already validated.
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: ImageUpload,
}

/// User service: orchestrates identity use-cases.
pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
    images: Arc<dyn ImageStore>,
    jwt_config: JwtConfig,
    password_cost: u32,
    timeouts: CallTimeouts,
}

impl UserService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        images: Arc<dyn ImageStore>,
        jwt_config: JwtConfig,
        password_cost: u32,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            repos,
            images,
            jwt_config,
            password_cost,
            timeouts,
        }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new user with a profile image and sign them in.
    pub async fn signup(&self, input: Signup) -> DomainResult<AuthResult> {
        let email = normalize_email(&input.email);

        if self
            .db("find user by email", self.repos.users().find_by_email(&email))
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(USER_EXISTS.into()));
        }

        let password = input.password;
        let cost = self.password_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| DomainError::Internal(format!("password hashing task failed: {}", e)))?
            .map_err(|e| DomainError::Internal(format!("failed to hash password: {}", e)))?;

        let stored = with_timeout(
            self.timeouts.storage,
            "image upload",
            self.images.upload(input.image),
            DomainError::Storage,
        )
        .await?;

        let mut compensation = CompensationLog::new(self.images.clone(), self.timeouts.storage);
        compensation.record(Compensation::DeleteImage {
            key: stored.key.clone(),
        });

        let image_key = stored.key.clone();
        let dto = CreateUserDto {
            name: input.name,
            email: email.clone(),
            password_hash,
            image: Some(stored),
        };
        let user = match self.db("create user", self.repos.users().create(dto)).await {
            Ok(user) => user,
            Err(e) => match self.stored_signup(&email, &image_key).await {
                Ok(Some(user)) => {
                    warn!(user_id = %user.id, error = %e, "Insert reported failure but the user was stored");
                    user
                }
                Ok(None) => {
                    compensation.unwind().await;
                    return Err(match e {
                        DomainError::Conflict(_) => DomainError::Conflict(USER_EXISTS.into()),
                        other => other,
                    });
                }
                Err(check) => {
                    warn!(error = %check, "Insert outcome unknown; keeping the uploaded image");
                    compensation.complete();
                    return Err(e);
                }
            },
        };
        compensation.complete();

        info!(user_id = %user.id, "New user registered");
        let user_id = user.id.clone();
        self.issue(user).inspect_err(|e| {
            warn!(user_id = %user_id, error = %e, "User was created but no token could be issued");
        })
    }

    /// The user this signup inserted, told apart from a concurrent signup
    /// with the same email by the uploaded image key.
    async fn stored_signup(&self, email: &str, image_key: &str) -> DomainResult<Option<User>> {
        let found = self
            .db("verify user", self.repos.users().find_by_email(email))
            .await?;
        Ok(found.filter(|user| {
            user.image
                .as_ref()
                .is_some_and(|image| image.key == image_key)
        }))
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by email + password and return a JWT.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<AuthResult> {
        let email = normalize_email(email);
        let Some(user) = self
            .db("find user by email", self.repos.users().find_by_email(&email))
            .await?
        else {
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| DomainError::Internal(format!("password check task failed: {}", e)))?
            .unwrap_or_else(|e| {
                warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
                false
            });

        if !valid {
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn list_users(&self) -> DomainResult<Vec<User>> {
        self.db("list users", self.repos.users().list_all()).await
    }

    pub async fn get_user(&self, user_id: &str) -> DomainResult<User> {
        self.db("find user", self.repos.users().find_by_id(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }

    fn issue(&self, user: User) -> DomainResult<AuthResult> {
        let token = create_token(&user.id, &user.email, &self.jwt_config)
            .map_err(|e| DomainError::Internal(format!("failed to sign token: {}", e)))?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }

    async fn db<T>(
        &self,
        operation_name: &str,
        operation: impl std::future::Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        with_timeout(
            self.timeouts.database,
            operation_name,
            operation,
            DomainError::Persistence,
        )
        .await
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
