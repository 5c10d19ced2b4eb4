use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_bool},
    models::{Credentials, NewUser, User, Video},
};
use crate::error::InputError;

fn row_to_user(row: &Row) -> Result<User> {
    let created_at: String = row.get("created_at")?;
    let is_admin: i64 = row.get("is_admin")?;

    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        is_admin: to_bool(is_admin),
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_video(row: &Row) -> Result<Video> {
    let created_at: String = row.get("created_at")?;

    Ok(Video {
        video_id: row.get("video_id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub(crate) fn user_exists(conn: &Connection, user_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn video_exists(conn: &Connection, video_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM videos WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

const USER_COLUMNS: &str = "id, username, full_name, is_admin, created_at";

pub(crate) fn find_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let mut rows = stmt.query(params![user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_user(row)?)),
        None => Ok(None),
    }
}

/// Whether `username` belongs to any account other than `except`.
fn username_taken(conn: &Connection, username: &str, except: Option<i64>) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1 AND id <> ?2",
            params![username, except.unwrap_or(-1)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn admin_exists(conn: &Connection) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE is_admin > 0 LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn insert_user_row(conn: &Connection, user: NewUser) -> Result<User> {
    if username_taken(conn, &user.username, None)? {
        return Err(InputError::DuplicateUsername(user.username).into());
    }

    conn.execute(
        "INSERT INTO users (username, full_name, password_hash, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.username,
            user.full_name,
            user.password_hash,
            i64::from(user.is_admin),
            format_datetime(&Utc::now()),
        ],
    )?;

    let user_id = conn.last_insert_rowid();
    find_user(conn, user_id)?.ok_or_else(|| anyhow!("User not found after insert"))
}

impl Database {
    /// Insert an account. The username must be free; field validation is
    /// the caller's job.
    pub async fn insert_user(&self, user: NewUser) -> Result<User> {
        self.execute(move |conn| insert_user_row(conn, user)).await
    }

    /// Insert `admin` unless some admin account already exists.
    pub async fn insert_admin_if_missing(&self, admin: NewUser) -> Result<Option<User>> {
        self.execute(move |conn| {
            if admin_exists(conn)? {
                return Ok(None);
            }
            insert_user_row(conn, admin).map(Some)
        })
        .await
    }

    /// Rename an account. The new username may equal the current one but
    /// not any other account's.
    pub async fn update_user_profile(
        &self,
        user_id: i64,
        username: &str,
        full_name: &str,
    ) -> Result<User> {
        let username = username.to_string();
        let full_name = full_name.to_string();
        self.execute(move |conn| {
            if !user_exists(conn, user_id)? {
                return Err(InputError::UnknownUser(user_id).into());
            }
            if username_taken(conn, &username, Some(user_id))? {
                return Err(InputError::DuplicateUsername(username).into());
            }

            conn.execute(
                "UPDATE users SET username = ?1, full_name = ?2 WHERE id = ?3",
                params![username, full_name, user_id],
            )?;
            find_user(conn, user_id)?.ok_or_else(|| anyhow!("User not found after update"))
        })
        .await
    }

    pub async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let password_hash = password_hash.to_string();
        self.execute(move |conn| {
            let rows = conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                params![password_hash, user_id],
            )?;
            if rows == 0 {
                return Err(InputError::UnknownUser(user_id).into());
            }
            Ok(())
        })
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.query(move |conn| find_user(conn, user_id)).await
    }

    pub async fn get_credentials(&self, username: &str) -> Result<Option<Credentials>> {
        let username = username.to_string();
        self.query(move |conn| {
            let credentials = conn
                .query_row(
                    "SELECT id, password_hash, is_admin FROM users WHERE username = ?1",
                    params![username],
                    |row| {
                        Ok(Credentials {
                            user_id: row.get(0)?,
                            password_hash: row.get(1)?,
                            is_admin: to_bool(row.get(2)?),
                        })
                    },
                )
                .optional()?;
            Ok(credentials)
        })
        .await
    }

    /// Register a piece of content. Video ids are unique.
    pub async fn insert_video(&self, video_id: &str, name: &str) -> Result<Video> {
        let video_id = video_id.to_string();
        let name = name.to_string();
        self.execute(move |conn| {
            if video_exists(conn, &video_id)? {
                return Err(InputError::DuplicateVideo(video_id).into());
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO videos (video_id, name, created_at) VALUES (?1, ?2, ?3)",
                params![video_id, name, format_datetime(&now)],
            )?;

            Ok(Video {
                video_id,
                name,
                created_at: now,
            })
        })
        .await
    }

    pub async fn get_video(&self, video_id: &str) -> Result<Option<Video>> {
        let video_id = video_id.to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT video_id, name, created_at FROM videos WHERE video_id = ?1 LIMIT 1",
            )?;
            let mut rows = stmt.query(params![video_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_video(row)?)),
                None => Ok(None),
            }
        })
        .await
    }
}
