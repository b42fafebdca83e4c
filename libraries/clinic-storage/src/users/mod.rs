//! User directory queries

use chrono::{DateTime, Utc};
use clinic_core::{
    error::{ClinicError, Result},
    types::{CreateUser, Role, User, UserId},
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

const SELECT_USERS: &str = r#"
    SELECT id, username, first_name, last_name, email, role, is_superuser,
           created_at, updated_at
    FROM users
"#;

/// Create a user account
///
/// Superusers are always stored with the `admin` role.
pub async fn create(pool: &SqlitePool, user: CreateUser) -> Result<User> {
    let now = Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (username, first_name, last_name, email, role, is_superuser, password_hash,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(user.effective_role().as_str())
    .bind(user.is_superuser)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = UserId::new(result.last_insert_rowid());
    tracing::info!(user_id = %id, role = %user.effective_role(), "Created user");

    get_by_id(pool, id)
        .await?
        .ok_or_else(|| ClinicError::Database("Failed to retrieve created user".to_string()))
}

/// Get user by ID
pub async fn get_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get user by login name
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get all users, optionally restricted to one role
pub async fn get_all(pool: &SqlitePool, role: Option<Role>) -> Result<Vec<User>> {
    let rows = match role {
        Some(role) => {
            sqlx::query(&format!("{SELECT_USERS} WHERE role = ? ORDER BY id"))
                .bind(role.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query(&format!("{SELECT_USERS} ORDER BY id"))
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(user_from_row).collect()
}

/// Get user's password hash for authentication
///
/// Returns `None` if the user does not exist or has no credentials.
pub async fn get_password_hash(pool: &SqlitePool, id: UserId) -> Result<Option<String>> {
    let hash: Option<Option<String>> =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(hash.flatten())
}

/// Delete a user; their appointments are removed by cascade
pub async fn delete(pool: &SqlitePool, id: UserId) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("User", id.to_string()));
    }

    tracing::info!(user_id = %id, "Deleted user");
    Ok(())
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        role: role
            .parse()
            .map_err(|_| ClinicError::Database(format!("Stored role is invalid: {role}")))?,
        is_superuser: row.try_get("is_superuser")?,
        created_at: timestamp(row.try_get("created_at")?)?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
    })
}

pub(crate) fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ClinicError::Database(format!("Invalid timestamp: {secs}")))
}
