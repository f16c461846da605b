use async_trait::async_trait;

use super::{CreateUserDto, User};
use crate::shared::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user with an empty place set.
    ///
    /// Fails with `DomainError::Conflict` when the email is taken.
    async fn create(&self, dto: CreateUserDto) -> DomainResult<User>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn list_all(&self) -> DomainResult<Vec<User>>;
}
