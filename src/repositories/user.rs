//! # User Repository
//!
//! Database access for user records. Lookups are exact on the stored
//! (normalized) email; case folding happens at signup, not here.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::Role;
use crate::models::user::{ActiveModel as UserActiveModel, Column, Entity as User, Model as UserModel};

/// Fields required to insert a user row. The password is already hashed by
/// the caller; this layer never sees plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub hashed_password: String,
    pub role: Role,
    pub staff_role: Option<String>,
    pub client_id: Option<Uuid>,
}

/// Repository for user database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find a user by exact email match
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, DbErr> {
        User::find()
            .filter(Column::Email.eq(email))
            .one(self.db)
            .await
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, DbErr> {
        User::find_by_id(id).one(self.db).await
    }

    /// List all users, newest first
    pub async fn list(&self) -> Result<Vec<UserModel>, DbErr> {
        User::find()
            .order_by_desc(Column::CreatedAt)
            .all(self.db)
            .await
    }

    /// Insert a new user row. Unique-constraint violations propagate
    /// unchanged so callers can map them to conflicts.
    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, DbErr> {
        let now = Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(new_user.email),
            name: Set(new_user.name),
            role: Set(new_user.role),
            staff_role: Set(new_user.staff_role),
            hashed_password: Set(new_user.hashed_password),
            client_id: Set(new_user.client_id),
            is_email_verified: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.db).await
    }

    /// Delete a user by ID. Returns false when no such user exists.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let Some(user) = User::find_by_id(id).one(self.db).await? else {
            return Ok(false);
        };

        user.delete(self.db).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::init_pool;
    use migration::MigratorTrait;

    async fn setup_test_db() -> DatabaseConnection {
        let config = AppConfig {
            profile: "test".to_string(),
            local_database_url: Some("sqlite::memory:".to_string()),
            // One pooled connection keeps every query on the same in-memory DB.
            db_max_connections: 1,
            ..Default::default()
        };

        let db = init_pool(&config).await.expect("Failed to init test DB");
        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        db
    }

    fn sample_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: Some("Alice".to_string()),
            hashed_password: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
            role: Role::User,
            staff_role: None,
            client_id: None,
        }
    }

    #[tokio::test]
    async fn create_and_find_by_email() {
        let db = setup_test_db().await;
        let repo = UserRepository::new(&db);

        let created = repo.create(sample_user("alice@example.com")).await.unwrap();
        assert_eq!(created.email, "alice@example.com");
        assert_eq!(created.role, Role::User);
        assert!(!created.is_email_verified);

        let found = repo.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn email_lookup_is_exact_not_case_folded() {
        let db = setup_test_db().await;
        let repo = UserRepository::new(&db);

        repo.create(sample_user("alice@example.com")).await.unwrap();

        let found = repo.find_by_email("Alice@Example.com").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_violates_unique_constraint() {
        let db = setup_test_db().await;
        let repo = UserRepository::new(&db);

        repo.create(sample_user("alice@example.com")).await.unwrap();
        let err = repo
            .create(sample_user("alice@example.com"))
            .await
            .unwrap_err();

        assert!(crate::error::is_unique_violation(&err));
        assert_eq!(
            crate::error::unique_conflict_target(&err),
            Some(crate::error::ConflictTarget::Email)
        );
    }

    #[tokio::test]
    async fn delete_reports_missing_user() {
        let db = setup_test_db().await;
        let repo = UserRepository::new(&db);

        assert!(!repo.delete(Uuid::new_v4()).await.unwrap());

        let created = repo.create(sample_user("alice@example.com")).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
    }
}
