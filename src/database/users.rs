// ABOUTME: User management database operations
// ABOUTME: Handles user creation, lookup, and password updates
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use super::Database;
use crate::models::{User, UserRole};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the users table and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                last_active DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Insert a new user
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The email is already in use
    /// - The database operation fails
    pub async fn create_user(&self, user: &User) -> Result<Uuid> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(anyhow!("Email already in use"));
        }

        sqlx::query(
            r"
            INSERT INTO users (id, email, name, password_hash, role, is_active, created_at, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.last_active)
        .execute(self.pool())
        .await?;

        Ok(user.id)
    }

    /// Get a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        self.get_user_impl("id", &user_id.to_string()).await
    }

    /// Get a user by email
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_impl("email", email).await
    }

    /// Update a user's password hash
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No user exists with the given email
    /// - The database operation fails
    pub async fn update_password(&self, email: &str, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, last_active = CURRENT_TIMESTAMP WHERE email = $1",
        )
        .bind(email)
        .bind(password_hash)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("User not found with email: {email}"));
        }

        Ok(())
    }

    /// Record account activity
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn touch_last_active(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(user_id.to_string())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Internal implementation for getting a user by a single column
    async fn get_user_impl(&self, field: &str, value: &str) -> Result<Option<User>> {
        let query = format!(
            r"
            SELECT id, email, name, password_hash, role, is_active, created_at, last_active
            FROM users WHERE {field} = $1
            "
        );

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(self.pool())
            .await?;

        row.map(|row| Self::row_to_user(&row)).transpose()
    }

    /// Convert a database row to a User struct
    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id: String = row.get("id");
        let role: String = row.get("role");
        let created_at: DateTime<Utc> = row.get("created_at");
        let last_active: DateTime<Utc> = row.get("last_active");

        Ok(User {
            id: Uuid::parse_str(&id)?,
            email: row.get("email"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
            role: UserRole::from_str_or_default(&role),
            is_active: row.get("is_active"),
            created_at,
            last_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn test_user(email: &str) -> User {
        User::new(email.to_owned(), "Test User".to_owned(), "$2b$10$hash".to_owned())
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let db = test_db().await;
        let user = test_user("a@example.com");
        let id = db.create_user(&user).await.unwrap();
        assert_eq!(id, user.id);

        let by_email = db.get_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.role, UserRole::User);

        let by_id = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        db.create_user(&test_user("a@example.com")).await.unwrap();
        assert!(db.create_user(&test_user("a@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_missing_user_returns_none() {
        let db = test_db().await;
        assert!(db.get_user_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(db.get_user_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_password() {
        let db = test_db().await;
        let user = test_user("a@example.com");
        db.create_user(&user).await.unwrap();

        db.update_password("a@example.com", "$2b$10$newhash").await.unwrap();
        let updated = db.get_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "$2b$10$newhash");

        assert!(db.update_password("nobody@example.com", "x").await.is_err());
    }
}
