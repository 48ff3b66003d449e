//! User profile table for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::{User, UserRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Identity-provider uid
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub uid: String,
    #[sea_orm(column_type = "Text")]
    pub email: String,
    pub nome: String,
    pub cognome: String,
    pub ruolo: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    /// Soft delete timestamp (NULL = active, set = deleted)
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            uid: model.uid,
            email: model.email,
            nome: model.nome,
            cognome: model.cognome,
            ruolo: UserRole::from(model.ruolo.as_str()),
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

impl From<User> for ActiveModel {
    fn from(user: User) -> Self {
        ActiveModel {
            uid: Set(user.uid),
            email: Set(user.email),
            nome: Set(user.nome),
            cognome: Set(user.cognome),
            ruolo: Set(user.ruolo.to_string()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
            deleted_at: Set(user.deleted_at),
        }
    }
}
