//! Project entity model
//!
//! Projects belong to a client. Signup provisions the first project in the
//! same transaction as the client and user.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::client::Entity as Client;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    /// Unique identifier for the project (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Project name, trimmed
    pub name: String,

    /// Owning client
    pub client_id: Uuid,

    /// Project status, defaults to "active"
    pub status: String,

    /// Free-text description (optional)
    pub description: Option<String>,

    /// Timestamp when the project was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the project was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Client",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<Client> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Project view returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafeProject {
    pub id: Uuid,
    pub name: String,
    pub client_id: Uuid,
    pub status: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2025-01-01T12:05:00Z")]
    pub updated_at: DateTimeWithTimeZone,
}

impl From<Model> for SafeProject {
    fn from(project: Model) -> Self {
        Self {
            id: project.id,
            name: project.name,
            client_id: project.client_id,
            status: project.status,
            description: project.description,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}
