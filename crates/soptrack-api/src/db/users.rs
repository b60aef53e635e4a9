//! Login account persistence.

use chrono::NaiveDateTime;
use serde::Serialize;
use soptrack_core::Role;
use sqlx::{SqliteExecutor, SqlitePool};

/// A user account.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub staff_id: Option<i64>,
    pub must_reset_password: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// Row of the admin user list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserListing {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub active: bool,
    pub must_reset_password: bool,
    pub staff_name: Option<String>,
}

/// Fields of a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub staff_id: Option<i64>,
    pub must_reset_password: bool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    staff_id: Option<i64>,
    must_reset_password: bool,
    active: bool,
    created_at: NaiveDateTime,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, sqlx::Error> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(UserRecord {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            role,
            staff_id: self.staff_id,
            must_reset_password: self.must_reset_password,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

const COLUMNS: &str =
    "id, username, password_hash, role, staff_id, must_reset_password, active, created_at";

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(UserRow::into_record)
        .transpose()
}

pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await?
        .map(UserRow::into_record)
        .transpose()
}

/// Insert an account. Returns `None` when the username is taken.
pub async fn insert(
    executor: impl SqliteExecutor<'_>,
    user: &NewUser<'_>,
) -> Result<Option<i64>, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, role, staff_id, must_reset_password)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.username)
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .bind(user.staff_id)
    .bind(user.must_reset_password)
    .execute(executor)
    .await;
    Ok(super::unique_violation_as_none(result)?.map(|r| r.last_insert_rowid()))
}

/// All accounts with their linked staff name, by username.
pub async fn list(pool: &SqlitePool) -> Result<Vec<UserListing>, sqlx::Error> {
    sqlx::query_as::<_, UserListing>(
        "SELECT users.id, users.username, users.role, users.active, users.must_reset_password,
                staff.name AS staff_name
         FROM users LEFT JOIN staff ON staff.id = users.staff_id
         ORDER BY users.username",
    )
    .fetch_all(pool)
    .await
}

pub async fn usernames(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT username FROM users ORDER BY username")
        .fetch_all(pool)
        .await
}

/// Flip `active`. Returns `false` when no such row exists.
pub async fn toggle_active(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET active = CASE WHEN active = 1 THEN 0 ELSE 1 END WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn require_reset(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET must_reset_password = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace the password hash and set the reset flag.
pub async fn set_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
    must_reset_password: bool,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET password_hash = ?, must_reset_password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(must_reset_password)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn duplicate_username_is_none() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let user = NewUser {
            username: "jdoe",
            password_hash: "salt$00",
            role: Role::Manager,
            staff_id: None,
            must_reset_password: false,
        };
        let id = insert(&pool, &user).await.unwrap().unwrap();
        assert!(insert(&pool, &user).await.unwrap().is_none());

        let stored = get(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Manager);
        assert!(stored.active);
        assert!(!stored.must_reset_password);
    }

    #[tokio::test]
    async fn password_and_flags() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let id = insert(
            &pool,
            &NewUser {
                username: "amy",
                password_hash: "a$00",
                role: Role::Staff,
                staff_id: None,
                must_reset_password: false,
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert!(require_reset(&pool, id).await.unwrap());
        assert!(get(&pool, id).await.unwrap().unwrap().must_reset_password);

        assert!(set_password(&pool, id, "b$11", false).await.unwrap());
        let user = find_by_username(&pool, "amy").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "b$11");
        assert!(!user.must_reset_password);

        assert!(toggle_active(&pool, id).await.unwrap());
        assert!(!get(&pool, id).await.unwrap().unwrap().active);
    }
}
