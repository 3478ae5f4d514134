//! Account management: credential hashing, login, bootstrap seeding.

use sha2::{Digest, Sha256};

use super::{AuthError, AuthResult, Session};
use crate::db::Database;
use crate::models::{Capability, Role, User};

/// Username of the account seeded into an empty store.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Initial password of the seeded account; changed on first login in practice.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
/// Organization the seeded account belongs to.
pub const DEFAULT_ORG_ID: &str = "MAIN";

/// Hash a password with a fresh random salt. Format: `salt$hex(sha256(salt || password))`.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

/// Check a password against a stored `salt$digest` hash.
pub fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Seed the default administrator into an empty store.
///
/// Returns true when an account was created. A store with any account at all
/// is left untouched.
pub fn seed_default_admin(db: &Database) -> AuthResult<bool> {
    if db.count_users()? > 0 {
        return Ok(false);
    }
    let admin = User::new(
        DEFAULT_ADMIN_USERNAME.into(),
        hash_password(DEFAULT_ADMIN_PASSWORD),
        Role::SuperAdmin,
        DEFAULT_ORG_ID.into(),
    );
    db.insert_user(&admin)?;
    Ok(true)
}

/// Authenticate a credential pair and open a session.
///
/// An empty user table is seeded first, so the very first login on a fresh
/// store succeeds with the default administrator credential.
pub fn authenticate(db: &Database, username: &str, password: &str) -> AuthResult<Session> {
    seed_default_admin(db)?;

    let user = db
        .get_user_by_username(username)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&user.password_hash, password) {
        return Err(AuthError::InvalidCredentials);
    }

    let config = db.load_config()?;
    Ok(Session::for_user(&user, config.fiscal_year))
}

/// Inputs for creating a staff account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub org_id: String,
    pub granted: Vec<Capability>,
    pub revoked: Vec<Capability>,
    pub display_name: Option<String>,
}

/// Create an account on behalf of a logged-in actor.
///
/// Role hierarchy gates creation only: a super admin creates sub-admins (and
/// users) in any organization; a sub-admin creates users inside its own; no
/// one creates another super admin.
pub fn create_user(db: &Database, actor: &Session, account: NewAccount) -> AuthResult<User> {
    actor.require(Capability::ManageUsers)?;

    match (actor.role, account.role) {
        (_, Role::SuperAdmin) => {
            return Err(AuthError::Forbidden(
                "Super admin accounts cannot be created".into(),
            ))
        }
        (Role::SuperAdmin, _) => {}
        (Role::SubAdmin, Role::User) => {
            let own_org = actor.writable_org()?;
            if account.org_id != own_org {
                return Err(AuthError::Forbidden(
                    "A sub-admin can only create users in its own organization".into(),
                ));
            }
        }
        _ => {
            return Err(AuthError::Forbidden(
                "This role cannot create accounts".into(),
            ))
        }
    }

    let mut user = User::new(
        account.username,
        hash_password(&account.password),
        account.role,
        account.org_id,
    );
    user.granted = account.granted;
    user.revoked = account.revoked;
    user.display_name = account.display_name;
    db.insert_user(&user)?;
    Ok(user)
}

/// Self-service password change, verifying the old password first.
pub fn change_password(
    db: &Database,
    session: &Session,
    old_password: &str,
    new_password: &str,
) -> AuthResult<()> {
    let mut user = db
        .get_user_by_username(&session.username)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&user.password_hash, old_password) {
        return Err(AuthError::InvalidCredentials);
    }
    user.password_hash = hash_password(new_password);
    db.update_user(&user)?;
    Ok(())
}
