//! # Account Service
//!
//! Business logic for authentication and account provisioning: credential
//! login, atomic client signup (client + owner user + first project in one
//! transaction), and guarded user creation.
//!
//! Login failures are deliberately uniform: unknown email and wrong password
//! produce the same response so the API surface does not reveal which emails
//! have accounts.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DatabaseTransaction, DbErr, Set, TransactionTrait};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{ApiError, conflict, invalid_credentials, invalid_signup_secret, unique_conflict_target, validation_error};
use crate::models::{Role, SafeClient, SafeProject, SafeUser, client, project, user};
use crate::password::{hash_password, verify_password};
use crate::repositories::{ClientRepository, NewUser, UserRepository};
use crate::token::TokenIssuer;

/// A successful authentication: the signed token plus the user it names.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user: SafeUser,
}

/// Everything created by a successful client signup.
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub access_token: String,
    pub user: SafeUser,
    pub client: SafeClient,
    pub project: SafeProject,
}

/// Normalized signup input. Callers validate field shapes; the service
/// normalizes (trims, lower-cases the email) before touching the database.
#[derive(Debug, Clone)]
pub struct SignupData {
    pub contact_name: String,
    pub company_name: String,
    pub email: String,
    pub password: String,
    pub project_name: String,
    pub signup_secret: Option<String>,
}

/// Input for guarded user creation.
#[derive(Debug, Clone)]
pub struct NewClientUser {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub role: Option<Role>,
    pub client_id: Option<Uuid>,
}

/// Account operations bound to a database connection and token issuer.
pub struct AccountService<'a> {
    db: &'a DatabaseConnection,
    tokens: &'a TokenIssuer,
    signup_secret: Option<&'a str>,
}

impl<'a> AccountService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        tokens: &'a TokenIssuer,
        signup_secret: Option<&'a str>,
    ) -> Self {
        Self {
            db,
            tokens,
            signup_secret,
        }
    }

    /// Authenticate an email/password pair and issue an access token.
    ///
    /// The email is matched exactly as stored; signup lower-cases emails, so
    /// a differently-cased login attempt fails like any bad credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let Some(user) = UserRepository::new(self.db).find_by_email(email).await? else {
            return Err(invalid_credentials());
        };

        if !verify_password(password, &user.hashed_password) {
            return Err(invalid_credentials());
        }

        let user = SafeUser::from(user);
        let access_token = self.issue_token(&user)?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthSession { access_token, user })
    }

    /// Provision a new client account: the client row, its first user
    /// (role USER), and a first project, all inside a single transaction.
    /// A failure anywhere leaves no partial rows behind.
    pub async fn client_signup(&self, signup: SignupData) -> Result<SignupOutcome, ApiError> {
        let contact_name = signup.contact_name.trim().to_string();
        let company_name = signup.company_name.trim().to_string();
        let email = signup.email.trim().to_lowercase();
        let project_name = signup.project_name.trim().to_string();

        self.check_signup_secret(signup.signup_secret.as_deref())?;

        // Advisory pre-checks give friendly conflicts in the common case; the
        // unique indexes stay authoritative under concurrency.
        if UserRepository::new(self.db)
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(conflict(crate::error::ConflictTarget::Email));
        }
        if ClientRepository::new(self.db)
            .find_by_name(&company_name)
            .await?
            .is_some()
        {
            return Err(conflict(crate::error::ConflictTarget::Company));
        }

        let hashed_password = hash_password(&signup.password).map_err(|err| {
            tracing::error!("Password hashing failed during signup: {}", err);
            ApiError::from(crate::error::ErrorType::InternalServerError)
        })?;

        let txn = self.db.begin().await.map_err(ApiError::from)?;

        let provisioned = provision_account(
            &txn,
            &contact_name,
            &company_name,
            &email,
            &hashed_password,
            &project_name,
        )
        .await;

        let (client, user, project) = match provisioned {
            Ok(rows) => rows,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Signup rollback failed: {}", rollback_err);
                }
                return Err(map_signup_db_error(err));
            }
        };

        if let Err(err) = txn.commit().await {
            return Err(map_signup_db_error(err));
        }

        let user = SafeUser::from(user);
        let access_token = self.issue_token(&user)?;

        tracing::info!(
            client_id = %client.id,
            user_id = %user.id,
            "Client signup completed"
        );

        Ok(SignupOutcome {
            access_token,
            user,
            client: SafeClient::from(client),
            project: SafeProject::from(project),
        })
    }

    /// Create a user under an existing client. The role defaults to USER when
    /// unspecified.
    pub async fn create_client_user(&self, data: NewClientUser) -> Result<SafeUser, ApiError> {
        let email = data.email.trim().to_lowercase();

        if let Some(client_id) = data.client_id {
            if ClientRepository::new(self.db)
                .find_by_id(client_id)
                .await?
                .is_none()
            {
                return Err(validation_error(
                    "Unknown client",
                    serde_json::json!({ "clientId": "No client with this id" }),
                ));
            }
        }

        let hashed_password = hash_password(&data.password).map_err(|err| {
            tracing::error!("Password hashing failed during user creation: {}", err);
            ApiError::from(crate::error::ErrorType::InternalServerError)
        })?;

        let created = UserRepository::new(self.db)
            .create(NewUser {
                email,
                name: data.name,
                hashed_password,
                role: data.role.unwrap_or(Role::User),
                staff_role: None,
                client_id: data.client_id,
            })
            .await
            .map_err(|err| match unique_conflict_target(&err) {
                Some(target) => conflict(target),
                None => ApiError::from(err),
            })?;

        tracing::info!(user_id = %created.id, "User created");
        Ok(SafeUser::from(created))
    }

    fn check_signup_secret(&self, supplied: Option<&str>) -> Result<(), ApiError> {
        let Some(configured) = self.signup_secret.filter(|secret| !secret.is_empty()) else {
            // No secret configured: signup is open.
            return Ok(());
        };

        let matches = supplied.is_some_and(|candidate| {
            ConstantTimeEq::ct_eq(candidate.as_bytes(), configured.as_bytes()).into()
        });

        if matches {
            Ok(())
        } else {
            Err(invalid_signup_secret())
        }
    }

    fn issue_token(&self, user: &SafeUser) -> Result<String, ApiError> {
        self.tokens.issue(user).map_err(|err| {
            tracing::error!("Token issuance failed: {}", err);
            ApiError::from(crate::error::ErrorType::InternalServerError)
        })
    }
}

async fn provision_account(
    txn: &DatabaseTransaction,
    contact_name: &str,
    company_name: &str,
    email: &str,
    hashed_password: &str,
    project_name: &str,
) -> Result<(client::Model, user::Model, project::Model), DbErr> {
    let now = Utc::now();

    let client = client::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(company_name.to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(Some(contact_name.to_string())),
        role: Set(Role::User),
        staff_role: Set(None),
        hashed_password: Set(hashed_password.to_string()),
        client_id: Set(Some(client.id)),
        is_email_verified: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    let project = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(project_name.to_string()),
        client_id: Set(client.id),
        status: Set("active".to_string()),
        description: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    Ok((client, user, project))
}

fn map_signup_db_error(err: DbErr) -> ApiError {
    match unique_conflict_target(&err) {
        Some(target) => {
            tracing::warn!(?target, "Signup lost a uniqueness race");
            conflict(target)
        }
        None => {
            tracing::error!("Signup transaction failed: {:?}", err);
            ApiError::from(err)
        }
    }
}
