//! Client entity model
//!
//! A client is the company-level account created once per signup; it owns
//! zero or more users and projects. Company names are unique after trimming.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    /// Unique identifier for the client (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Company name, trimmed (unique)
    pub name: String,

    /// Timestamp when the client was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the client was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
    #[sea_orm(has_many = "super::project::Entity")]
    Projects,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Client view returned to callers; carries no sensitive fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafeClient {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2025-01-01T12:05:00Z")]
    pub updated_at: DateTimeWithTimeZone,
}

impl From<Model> for SafeClient {
    fn from(client: Model) -> Self {
        Self {
            id: client.id,
            name: client.name,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}
