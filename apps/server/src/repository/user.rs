use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::UserRepository;
use crate::models::{NewUser, Role, User};

const USER_SELECT: &str =
    "SELECT id, email, password_hash, first_name, last_name, account_locked, role, created_at FROM users";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    account_locked: bool,
    role: String,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            account_locked: row.account_locked,
            role: row.role.parse::<Role>().map_err(|e| anyhow!(e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    db: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<Option<User>> {
        let inserted = sqlx::query(
            "INSERT INTO users (email, password_hash, first_name, last_name, role)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .execute(&self.db)
        .await;

        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Ok(None),
            Err(e) => return Err(anyhow::Error::new(e).context("insert user")),
        };

        let user = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("user {id} vanished after insert"))?;
        Ok(Some(user))
    }

    async fn set_locked(&self, id: i64, locked: bool) -> Result<()> {
        sqlx::query("UPDATE users SET account_locked = ? WHERE id = ?")
            .bind(locked)
            .bind(id)
            .execute(&self.db)
            .await
            .context("update account lock")?;
        Ok(())
    }
}
