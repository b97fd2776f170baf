//! Member records and the login lifecycle around them.
//!
//! Admin-created members start pending: no password hash, `must_reset_password` set
//! and a one-time setup token whose SHA-256 digest is the only thing stored. The token
//! itself is returned once, to the admin, and exchanged later through
//! [`setup_password`]. Self-registered members choose a password immediately; the very
//! first one becomes `admin`.

use crate::{
    core::{
        auth::{MemberScope, generate_setup_token, hash_password, hash_setup_token, verify_password},
        input::{optional_text, require_text},
        settings::{BalancePolicy, adjust_current_balance, get_current_balance},
    },
    entities::{Member, Payment, Role, member, payment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Longest accepted registration number, in characters.
pub const MAX_REGISTRATION_NUMBER_LEN: usize = 50;

/// Body of a member create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub registration_number: Option<String>,
    /// Defaults to `viewer` on create; unchanged on update when absent
    pub role: Option<Role>,
    /// Unchanged on update when absent
    pub active: Option<bool>,
}

/// Body of a self-registration request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub registration_number: Option<String>,
    pub nickname: Option<String>,
}

/// A member together with the setup token issued for it. The token is never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMember {
    pub member: member::Model,
    pub setup_token: String,
}

/// Trims and lowercases an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accepts a trimmed registration number of 1 to 50 characters.
pub fn validate_registration_number(value: Option<&str>) -> Result<String> {
    let trimmed = require_text(value, "registrationNumber")?;
    if trimmed.chars().count() > MAX_REGISTRATION_NUMBER_LEN {
        return Err(Error::validation(format!(
            "Registration number must be at most {MAX_REGISTRATION_NUMBER_LEN} characters"
        )));
    }
    Ok(trimmed)
}

fn require_email(value: Option<&str>) -> Result<String> {
    let email = normalize_email(&require_text(value, "email")?);
    if !email.contains('@') {
        return Err(Error::validation(format!("Invalid email '{email}'")));
    }
    Ok(email)
}

/// Rejects an email or registration number already used by another member.
async fn ensure_unique<C>(
    db: &C,
    email: &str,
    registration_number: &str,
    exclude_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Member::find().filter(
        Condition::any()
            .add(member::Column::Email.eq(email))
            .add(member::Column::RegistrationNumber.eq(registration_number)),
    );
    if let Some(id) = exclude_id {
        query = query.filter(member::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::Conflict {
            message: "Email or registration number already registered".to_string(),
        });
    }
    Ok(())
}

/// Retrieves a member by id.
pub async fn get_member(db: &DatabaseConnection, member_id: i64) -> Result<member::Model> {
    Member::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })
}

/// Members visible under `scope`, ordered by name.
pub async fn list_members(
    db: &DatabaseConnection,
    scope: MemberScope,
) -> Result<Vec<member::Model>> {
    let query = Member::find().order_by_asc(member::Column::Name);
    let query = match scope {
        MemberScope::All => query,
        MemberScope::Member(id) => query.filter(member::Column::Id.eq(id)),
        MemberScope::Nobody => return Ok(Vec::new()),
    };
    query.all(db).await.map_err(Into::into)
}

/// Members with no payment for the period, or with any unpaid one.
///
/// `month` and `year` narrow which payments are considered; with neither, every payment
/// counts.
pub async fn delinquent_members(
    db: &DatabaseConnection,
    month: Option<i32>,
    year: Option<i32>,
    scope: MemberScope,
) -> Result<Vec<member::Model>> {
    let members = list_members(db, scope).await?;

    let mut query = Payment::find();
    if let Some(month) = month {
        query = query.filter(payment::Column::Month.eq(month));
    }
    if let Some(year) = year {
        query = query.filter(payment::Column::Year.eq(year));
    }
    let mut settled: HashMap<i64, bool> = HashMap::new();
    for payment in query.all(db).await? {
        let all_paid = settled.entry(payment.member_id).or_insert(true);
        *all_paid &= payment.paid;
    }

    Ok(members
        .into_iter()
        .filter(|member| !settled.get(&member.id).copied().unwrap_or(false))
        .collect())
}

/// Creates a member pending password setup and returns its one-time setup token.
#[instrument(skip(db, input))]
pub async fn create_member(db: &DatabaseConnection, input: MemberInput) -> Result<CreatedMember> {
    let name = require_text(input.name.as_deref(), "name")?;
    let email = require_email(input.email.as_deref())?;
    let registration_number = validate_registration_number(input.registration_number.as_deref())?;

    ensure_unique(db, &email, &registration_number, None).await?;

    let setup_token = generate_setup_token();
    let now = Utc::now().naive_utc();
    let member = member::ActiveModel {
        name: Set(name),
        email: Set(Some(email)),
        nickname: Set(optional_text(input.nickname)),
        registration_number: Set(Some(registration_number)),
        role: Set(input.role.unwrap_or(Role::Viewer)),
        active: Set(input.active.unwrap_or(true)),
        password_hash: Set(None),
        must_reset_password: Set(true),
        setup_token_hash: Set(Some(hash_setup_token(&setup_token))),
        setup_token_created_at: Set(Some(now)),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created member {} pending setup", member.id);
    Ok(CreatedMember {
        member,
        setup_token,
    })
}

/// Issues a fresh setup token for an existing member and resets their password.
pub async fn invite_member(db: &DatabaseConnection, member_id: i64) -> Result<CreatedMember> {
    let existing = get_member(db, member_id).await?;
    if existing.email.is_none() {
        return Err(Error::validation(
            "The member needs an email before an access link can be issued",
        ));
    }

    let setup_token = generate_setup_token();
    let mut active_model: member::ActiveModel = existing.into();
    active_model.password_hash = Set(None);
    active_model.must_reset_password = Set(true);
    active_model.setup_token_hash = Set(Some(hash_setup_token(&setup_token)));
    active_model.setup_token_created_at = Set(Some(Utc::now().naive_utc()));
    let member = active_model.update(db).await?;

    info!("Issued new setup token for member {member_id}");
    Ok(CreatedMember {
        member,
        setup_token,
    })
}

/// Self-registration. The first member ever becomes `admin`, everyone after `viewer`.
#[instrument(skip(db, input))]
pub async fn register_member(
    db: &DatabaseConnection,
    input: RegisterInput,
) -> Result<member::Model> {
    let name = require_text(input.name.as_deref(), "name")?;
    let email = require_email(input.email.as_deref())?;
    let password = require_text(input.password.as_deref(), "password")?;
    let registration_number = validate_registration_number(input.registration_number.as_deref())?;
    let password_hash = hash_password(&password)?;

    let txn = db.begin().await?;

    ensure_unique(&txn, &email, &registration_number, None).await?;
    let role = if Member::find().count(&txn).await? == 0 {
        Role::Admin
    } else {
        Role::Viewer
    };

    let member = member::ActiveModel {
        name: Set(name),
        email: Set(Some(email)),
        nickname: Set(optional_text(input.nickname)),
        registration_number: Set(Some(registration_number)),
        role: Set(role),
        active: Set(true),
        password_hash: Set(Some(password_hash)),
        must_reset_password: Set(false),
        setup_token_hash: Set(None),
        setup_token_created_at: Set(None),
        joined_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Registered member {} as {:?}", member.id, member.role);
    Ok(member)
}

/// Updates identity fields; role and active flag change only when provided.
pub async fn update_member(
    db: &DatabaseConnection,
    member_id: i64,
    input: MemberInput,
) -> Result<member::Model> {
    let name = require_text(input.name.as_deref(), "name")?;
    let email = require_email(input.email.as_deref())?;
    let registration_number = validate_registration_number(input.registration_number.as_deref())?;

    let existing = get_member(db, member_id).await?;
    ensure_unique(db, &email, &registration_number, Some(member_id)).await?;

    let mut active_model: member::ActiveModel = existing.into();
    active_model.name = Set(name);
    active_model.email = Set(Some(email));
    active_model.nickname = Set(optional_text(input.nickname));
    active_model.registration_number = Set(Some(registration_number));
    if let Some(role) = input.role {
        active_model.role = Set(role);
    }
    if let Some(active) = input.active {
        active_model.active = Set(active);
    }
    active_model.update(db).await.map_err(Into::into)
}

/// Deletes a member and all of their payments, removing each payment's contribution
/// from the scalar balance in the same transaction. Returns the number of payments removed.
#[instrument(skip(db))]
pub async fn delete_member(
    db: &DatabaseConnection,
    policy: BalancePolicy,
    member_id: i64,
) -> Result<u64> {
    let txn = db.begin().await?;

    get_current_balance(&txn).await?;
    Member::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let payments = Payment::find()
        .filter(payment::Column::MemberId.eq(member_id))
        .all(&txn)
        .await?;
    let delta: f64 = -payments
        .iter()
        .map(|payment| policy.contribution(payment.amount, payment.paid))
        .sum::<f64>();

    let removed = Payment::delete_many()
        .filter(payment::Column::MemberId.eq(member_id))
        .exec(&txn)
        .await?
        .rows_affected;
    Member::delete_by_id(member_id).exec(&txn).await?;
    let balance = adjust_current_balance(&txn, delta).await?;

    txn.commit().await?;
    info!(
        "Deleted member {member_id} with {removed} payments, balance {delta:+.2} -> {balance:.2}"
    );
    Ok(removed)
}

/// Exchanges a setup token for a password and clears the pending flag.
#[instrument(skip(db, token, password))]
pub async fn setup_password(
    db: &DatabaseConnection,
    token: Option<&str>,
    password: Option<&str>,
) -> Result<member::Model> {
    let token = require_text(token, "token")?;
    let password = require_text(password, "password")?;

    let existing = Member::find()
        .filter(member::Column::SetupTokenHash.eq(hash_setup_token(&token)))
        .one(db)
        .await?
        .filter(|member| member.active)
        .ok_or_else(|| Error::validation("Invalid setup token"))?;

    let mut active_model: member::ActiveModel = existing.into();
    active_model.password_hash = Set(Some(hash_password(&password)?));
    active_model.must_reset_password = Set(false);
    active_model.setup_token_hash = Set(None);
    active_model.setup_token_created_at = Set(None);
    let member = active_model.update(db).await?;

    info!("Member {} completed password setup", member.id);
    Ok(member)
}

/// Checks an email and password pair against the stored members.
///
/// Unknown or inactive members and wrong passwords are `InvalidCredentials`; members
/// still pending setup are `Forbidden`.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<member::Model> {
    let member = Member::find()
        .filter(member::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?
        .filter(|member| member.active)
        .ok_or(Error::InvalidCredentials)?;

    if member.must_reset_password {
        return Err(Error::forbidden(
            "Set your password through the first-access link",
        ));
    }
    let Some(stored_hash) = member.password_hash.as_deref() else {
        return Err(Error::InvalidCredentials);
    };
    if !verify_password(password, stored_hash)? {
        warn!("Failed login for member {}", member.id);
        return Err(Error::InvalidCredentials);
    }
    Ok(member)
}
