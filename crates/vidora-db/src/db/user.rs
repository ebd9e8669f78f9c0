use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use vidora_core::models::{NewUser, User};
use vidora_core::AppError;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, tenant_id, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `AppError::UserExists` when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, AppError>;

    /// Lookup by email (callers pass it lower-cased).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[tracing::instrument(skip(self, new), fields(role = %new.role))]
    async fn create(&self, new: NewUser) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, role, tenant_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let result = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role)
            .bind(&new.tenant_id)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::UserExists(new.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
