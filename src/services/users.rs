use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::AuthService;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Input for registering an account.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Outcome of registration or login: the account plus a signed access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: user::Model,
    pub token: String,
}

/// Account registration and login. Token issuance and password hashing are
/// delegated to [`AuthService`]; this service owns the user records.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: EventSender,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthenticatedUser, ServiceError> {
        let email = input.email.trim().to_lowercase();

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(&email))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = self.auth.hash_password(&input.password)?;
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            display_name: Set(input.display_name.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        let token = self.auth.generate_token(created.id, &created.email)?;
        self.event_sender
            .send(Event::UserRegistered(created.id))
            .await;

        info!(user_id = %created.id, "User registered");
        Ok(AuthenticatedUser {
            user: created,
            token,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, ServiceError> {
        let email = email.trim().to_lowercase();

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(&email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid credentials".to_string()))?;

        self.auth.verify_password(password, &account.password_hash)?;
        let token = self.auth.generate_token(account.id, &account.email)?;

        Ok(AuthenticatedUser {
            user: account,
            token,
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}
