//! User account service: registration, login, bans, profile updates.

use chrono::Utc;
use common::{Role, User, UserId, Version};
use store::UserStore;
use validator::Validate;

use crate::error::UserError;

use super::password::{hash_password, verify_password};
use super::request::{
    LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateProfileRequest,
};

/// Service for managing user accounts.
pub struct UserService<S: UserStore> {
    store: S,
}

impl<S: UserStore> UserService<S> {
    /// Creates a new user service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a new customer account.
    ///
    /// The password is hashed before it ever reaches the store; the
    /// email must not already be registered.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<User, UserError> {
        req.validate()
            .map_err(|e| UserError::InvalidInput(e.to_string()))?;

        if self.store.get_user_by_email(&req.email).await?.is_some() {
            return Err(UserError::EmailTaken(req.email));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: hash_password(&req.password)?,
            role: Role::Customer,
            is_banned: false,
            created_at: now,
            updated_at: now,
            version: Version::first(),
        };

        let stored = self.store.insert_user(user).await?;
        metrics::counter!("users_registered_total").increment(1);
        Ok(stored)
    }

    /// Authenticates an account by email and password.
    ///
    /// Unknown email and wrong password fail identically. Banned
    /// accounts fail distinctly, but only after the password checks
    /// out, so a ban probe still needs valid credentials.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<User, UserError> {
        req.validate()
            .map_err(|e| UserError::InvalidInput(e.to_string()))?;

        let user = self
            .store
            .get_user_by_email(&req.email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(&req.password, &user.password) {
            return Err(UserError::InvalidCredentials);
        }
        if user.is_banned {
            return Err(UserError::Banned);
        }
        Ok(user)
    }

    /// Fetches a user by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<User, UserError> {
        self.store
            .get_user(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Lists users, optionally only banned ones.
    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self, banned_only: bool) -> Result<Vec<User>, UserError> {
        Ok(self.store.list_users(banned_only).await?)
    }

    /// Bans an account. Banning an already banned account is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn ban_user(&self, id: UserId) -> Result<User, UserError> {
        self.set_banned(id, true).await
    }

    /// Lifts a ban. Unbanning an active account is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn unban_user(&self, id: UserId) -> Result<User, UserError> {
        self.set_banned(id, false).await
    }

    /// Updates profile fields on the caller's own account.
    #[tracing::instrument(skip(self, req))]
    pub async fn update_profile(
        &self,
        id: UserId,
        req: UpdateProfileRequest,
    ) -> Result<User, UserError> {
        req.validate()
            .map_err(|e| UserError::InvalidInput(e.to_string()))?;

        let mut user = self.get_user(id).await?;
        if let Some(first_name) = req.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = req.last_name {
            user.last_name = last_name;
        }
        Ok(self.store.update_user(&user).await?)
    }

    /// Changes the account password after verifying the current one.
    #[tracing::instrument(skip(self, req))]
    pub async fn update_password(
        &self,
        id: UserId,
        req: UpdatePasswordRequest,
    ) -> Result<User, UserError> {
        req.validate()
            .map_err(|e| UserError::InvalidInput(e.to_string()))?;

        let mut user = self.get_user(id).await?;
        if !verify_password(&req.old_password, &user.password) {
            return Err(UserError::InvalidCredentials);
        }
        user.password = hash_password(&req.new_password)?;
        Ok(self.store.update_user(&user).await?)
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<User, UserError> {
        let mut user = self.get_user(id).await?;
        if user.is_banned == banned {
            return Ok(user);
        }
        user.is_banned = banned;
        let stored = self.store.update_user(&user).await?;
        if banned {
            metrics::counter!("users_banned_total").increment(1);
        }
        Ok(stored)
    }
}
