//! Identity primitives: the authenticated principal, bearer tokens, password and
//! setup-token hashing.

use crate::{
    entities::{MemberModel, Role},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Who is calling. Decoded from the bearer token on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Access level
    pub role: Role,
    /// Absent for the bootstrap admin, which has no member row
    pub member_id: Option<i64>,
    /// Login email
    pub email: Option<String>,
    /// Display name, empty for the bootstrap admin
    #[serde(default)]
    pub name: String,
}

impl Principal {
    /// Principal for a stored member.
    #[must_use]
    pub fn from_member(member: &MemberModel) -> Self {
        Self {
            role: member.role,
            member_id: Some(member.id),
            email: member.email.clone(),
            name: member.name.clone(),
        }
    }

    /// Principal for the configured bootstrap admin.
    #[must_use]
    pub fn bootstrap_admin(email: &str) -> Self {
        Self {
            role: Role::Admin,
            member_id: None,
            email: Some(email.to_string()),
            name: String::new(),
        }
    }

    /// Admin or financial director.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    /// Admin only.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Which members' records a read may return.
    ///
    /// Privileged principals get what they asked for. Viewers are always narrowed to
    /// their own member id and get `Forbidden` when asking for someone else.
    pub fn scope_member(&self, requested: Option<i64>) -> Result<MemberScope> {
        if self.is_privileged() {
            return Ok(requested.map_or(MemberScope::All, MemberScope::Member));
        }
        match (self.member_id, requested) {
            (Some(own), Some(other)) if own != other => Err(Error::forbidden(
                "Viewers may only access their own records",
            )),
            (Some(own), _) => Ok(MemberScope::Member(own)),
            (None, _) => Ok(MemberScope::Nobody),
        }
    }
}

/// Result of narrowing a read to what the principal may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    /// Every member
    All,
    /// One member only
    Member(i64),
    /// Nothing at all (viewer without a member row)
    Nobody,
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    #[serde(flatten)]
    principal: Principal,
    iat: i64,
    exp: i64,
}

/// Signs an HS256 token for `principal`, valid for `ttl_hours`.
///
/// # Errors
/// Returns `Error::Config` when the expiry falls outside the representable range.
pub fn issue_token(secret: &str, principal: &Principal, ttl_hours: i64) -> Result<String> {
    let now = Utc::now();
    let expires_at = TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config {
            message: format!("Token lifetime of {ttl_hours} hours is out of range"),
        })?;
    let claims = Claims {
        principal: principal.clone(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Config {
        message: format!("Could not sign token: {e}"),
    })
}

/// Verifies signature and expiry and returns the principal.
pub fn decode_token(secret: &str, token: &str) -> Result<Principal> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &validation)?;
    Ok(data.claims.principal)
}

/// Argon2 hash with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks `password` against a stored Argon2 hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Random one-time setup token (48 hex characters).
#[must_use]
pub fn generate_setup_token() -> String {
    let mut bytes = [0_u8; 24];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest under which a setup token is stored.
#[must_use]
pub fn hash_setup_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
