//! User account database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Capability, OrgScope, Role, User};

impl Database {
    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (
                id, username, password_hash, role, org_id, granted, revoked,
                display_name, contact, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                user.id,
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.org_id,
                serde_json::to_string(&user.granted)?,
                serde_json::to_string(&user.revoked)?,
                user.display_name,
                user.contact,
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing user.
    pub fn update_user(&self, user: &User) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE users SET
                password_hash = ?2,
                role = ?3,
                org_id = ?4,
                granted = ?5,
                revoked = ?6,
                display_name = ?7,
                contact = ?8,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.password_hash,
                user.role.as_str(),
                user.org_id,
                serde_json::to_string(&user.granted)?,
                serde_json::to_string(&user.revoked)?,
                user.display_name,
                user.contact,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                [id],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a user by username.
    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"),
                [username],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List users visible in an org scope.
    pub fn list_users(&self, scope: &OrgScope) -> DbResult<Vec<User>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE (?1 IS NULL OR org_id = ?1)
            ORDER BY username
            "#
        ))?;
        let rows = stmt.query_map([org], map_user_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok(users)
    }

    /// Delete a user.
    pub fn delete_user(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Total number of accounts, across all organizations.
    pub fn count_users(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, role, org_id, granted, revoked, \
     display_name, contact, created_at, updated_at";

/// Intermediate row struct for database mapping.
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    role: String,
    org_id: String,
    granted: String,
    revoked: String,
    display_name: Option<String>,
    contact: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        org_id: row.get(4)?,
        granted: row.get(5)?,
        revoked: row.get(6)?,
        display_name: row.get(7)?,
        contact: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", row.role)))?;
        let granted: Vec<Capability> = serde_json::from_str(&row.granted)?;
        let revoked: Vec<Capability> = serde_json::from_str(&row.revoked)?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            org_id: row.org_id,
            granted,
            revoked,
            display_name: row.display_name,
            contact: row.contact,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get_by_username() {
        let db = setup_db();
        let mut user = User::new("kabita".into(), "salt$hash".into(), Role::User, "MAIN".into());
        user.granted.push(Capability::ViewFinancialReports);
        user.revoked.push(Capability::ProcessSales);
        db.insert_user(&user).unwrap();

        let retrieved = db.get_user_by_username("kabita").unwrap().unwrap();
        assert_eq!(retrieved.role, Role::User);
        assert_eq!(retrieved.granted, vec![Capability::ViewFinancialReports]);
        assert_eq!(retrieved.revoked, vec![Capability::ProcessSales]);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = setup_db();
        let user = User::new("kabita".into(), "x$y".into(), Role::User, "MAIN".into());
        db.insert_user(&user).unwrap();

        let dup = User::new("kabita".into(), "x$y".into(), Role::User, "MAIN".into());
        assert!(db.insert_user(&dup).is_err());
    }

    #[test]
    fn test_count_and_list_by_scope() {
        let db = setup_db();
        assert_eq!(db.count_users().unwrap(), 0);

        db.insert_user(&User::new("a".into(), "x$y".into(), Role::SubAdmin, "MAIN".into()))
            .unwrap();
        db.insert_user(&User::new("b".into(), "x$y".into(), Role::User, "BRANCH-2".into()))
            .unwrap();

        assert_eq!(db.count_users().unwrap(), 2);
        assert_eq!(
            db.list_users(&OrgScope::Org("MAIN".into())).unwrap().len(),
            1
        );
        assert_eq!(db.list_users(&OrgScope::All).unwrap().len(), 2);
    }

    #[test]
    fn test_update_user() {
        let db = setup_db();
        let mut user = User::new("kabita".into(), "x$y".into(), Role::User, "MAIN".into());
        db.insert_user(&user).unwrap();

        user.display_name = Some("Kabita Shrestha".into());
        user.granted.push(Capability::ExportData);
        assert!(db.update_user(&user).unwrap());

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved.display_name.as_deref(), Some("Kabita Shrestha"));
        assert!(retrieved
            .effective_permissions()
            .contains(Capability::ExportData));
    }
}
