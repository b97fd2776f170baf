//! Member entity - A person in the organisation and, optionally, a login identity.
//!
//! Members created by an admin start "pending setup": they carry no password hash,
//! `must_reset_password` is set and only the SHA-256 hash of a one-time setup token
//! is stored. Deleting a member removes all of their payments.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access role carried by a member and by every authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including member management
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Financial director, may mutate financial records
    #[sea_orm(string_value = "diretor_financeiro")]
    DiretorFinanceiro,
    /// Read-only, scoped to the member's own records
    #[sea_orm(string_value = "viewer")]
    Viewer,
}

impl Role {
    /// `admin` and `diretor_financeiro` may mutate financial records.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Admin | Self::DiretorFinanceiro)
    }
}

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login identity, stored trimmed and lowercased
    pub email: Option<String>,
    /// Optional nickname
    pub nickname: Option<String>,
    /// Free-text registration number (1 to 50 characters)
    pub registration_number: Option<String>,
    /// Access role
    pub role: Role,
    /// Inactive members cannot log in
    pub active: bool,
    /// Argon2 hash; absent while the member is pending setup
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Login is refused until the setup link has been used
    pub must_reset_password: bool,
    /// SHA-256 hex digest of the one-time setup token
    #[serde(skip_serializing)]
    pub setup_token_hash: Option<String>,
    /// When the current setup token was issued
    pub setup_token_created_at: Option<DateTime>,
    /// When the member joined
    pub joined_at: DateTime,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One member has many monthly payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
