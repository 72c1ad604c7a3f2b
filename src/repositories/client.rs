//! # Client Repository
//!
//! Database access for client (tenant) records.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::models::client::{Column, Entity as Client, Model as ClientModel};

/// Repository for client database operations
pub struct ClientRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ClientRepository<'a> {
    /// Create a new ClientRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find a client by exact company name match
    pub async fn find_by_name(&self, name: &str) -> Result<Option<ClientModel>, DbErr> {
        Client::find()
            .filter(Column::Name.eq(name))
            .one(self.db)
            .await
    }

    /// Find a client by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClientModel>, DbErr> {
        Client::find_by_id(id).one(self.db).await
    }
}
