//! Persistence layer. Every function borrows the pool and acquires a
//! connection only for the duration of its own query; nothing holds a
//! connection across a conversation.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use std::collections::HashSet;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: Option<String>,
    pub points: i64,
    pub role: String,
    pub is_banned: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuestProgress {
    pub user_id: i64,
    pub current_task: i32,
    pub city: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RatingEntry {
    pub username: Option<String>,
    pub points: i64,
}

/// Idempotent schema setup, run once at process start. A failure here is the
/// only fatal persistence error in the program.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT PRIMARY KEY,
            username VARCHAR(255),
            points BIGINT NOT NULL DEFAULT 0,
            role VARCHAR(16) NOT NULL DEFAULT 'user',
            is_banned BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS quest_submissions (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            city TEXT NOT NULL,
            task_number INTEGER NOT NULL,
            photo_id TEXT,
            answer TEXT,
            submission_time TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS user_progress (
            user_id BIGINT PRIMARY KEY,
            current_task INTEGER NOT NULL,
            city TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS completed_categories (
            user_id BIGINT NOT NULL,
            category_id TEXT NOT NULL,
            PRIMARY KEY (user_id, category_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS news (
            id BIGSERIAL PRIMARY KEY,
            body TEXT NOT NULL,
            created_by BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS news_delivery_logs (
            id BIGSERIAL PRIMARY KEY,
            news_id BIGINT NOT NULL,
            total INTEGER NOT NULL,
            delivered INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            finished_at TIMESTAMPTZ NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

// ---------- users ----------

/// Create-on-first-contact; a no-op if the user already exists.
pub async fn upsert_user(pool: &PgPool, id: i64, username: Option<&str>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username)
        VALUES ($1, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(username)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_user(pool: &PgPool, id: i64) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, username, points, role, is_banned
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn is_admin(pool: &PgPool, id: i64) -> Result<bool> {
    Ok(find_user(pool, id)
        .await?
        .map(|u| u.role == "admin")
        .unwrap_or(false))
}

/// Atomic store-level increment; never read-modify-write in the application.
pub async fn add_points(pool: &PgPool, id: i64, delta: i64) -> Result<()> {
    sqlx::query("UPDATE users SET points = points + $2 WHERE id = $1")
        .bind(id)
        .bind(delta)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn top_users(pool: &PgPool, limit: i64) -> Result<Vec<RatingEntry>> {
    let rows = sqlx::query_as::<_, RatingEntry>(
        r#"
        SELECT username, points
        FROM users
        ORDER BY points DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn admin_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT id FROM users WHERE role = 'admin'")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>("id")).collect())
}

/// Broadcast recipients: everyone not banned.
pub async fn active_user_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT id FROM users WHERE is_banned = FALSE")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>("id")).collect())
}

// ---------- quest progress ----------

pub async fn fetch_progress(pool: &PgPool, user_id: i64) -> Result<Option<QuestProgress>> {
    let progress = sqlx::query_as::<_, QuestProgress>(
        r#"
        SELECT user_id, current_task, city
        FROM user_progress
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(progress)
}

pub async fn upsert_progress(
    pool: &PgPool,
    user_id: i64,
    current_task: i32,
    city: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_progress (user_id, current_task, city)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE
        SET current_task = $2, city = $3
        "#,
    )
    .bind(user_id)
    .bind(current_task)
    .bind(city)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_progress(pool: &PgPool, user_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM user_progress WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------- quest submissions ----------

/// Append-only audit trail; one row per committed stage.
pub async fn insert_submission(
    pool: &PgPool,
    user_id: i64,
    city: &str,
    task_number: i32,
    photo_id: Option<&str>,
    answer: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO quest_submissions
            (user_id, city, task_number, photo_id, answer, submission_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(city)
    .bind(task_number)
    .bind(photo_id)
    .bind(answer)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Repeat-completion guard: has this user already committed the given stage?
pub async fn has_submission_for_stage(
    pool: &PgPool,
    user_id: i64,
    task_number: i32,
) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM quest_submissions
            WHERE user_id = $1 AND task_number = $2
        ) AS found
        "#,
    )
    .bind(user_id)
    .bind(task_number)
    .fetch_one(pool)
    .await?;
    Ok(row.get::<bool, _>("found"))
}

// ---------- quiz completion ----------

pub async fn completed_categories(pool: &PgPool, user_id: i64) -> Result<HashSet<String>> {
    let rows = sqlx::query("SELECT category_id FROM completed_categories WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| r.get::<String, _>("category_id"))
        .collect())
}

pub async fn insert_completed_category(
    pool: &PgPool,
    user_id: i64,
    category_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO completed_categories (user_id, category_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, category_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Admin-only: everyone gets to retake every category.
pub async fn reset_completed_categories(pool: &PgPool) -> Result<()> {
    sqlx::query("TRUNCATE completed_categories")
        .execute(pool)
        .await?;
    Ok(())
}

// ---------- news ----------

pub async fn insert_news(pool: &PgPool, body: &str, created_by: i64) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO news (body, created_by, created_at)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(body)
    .bind(created_by)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row.get::<i64, _>("id"))
}

pub async fn log_news_delivery(
    pool: &PgPool,
    news_id: i64,
    total: i32,
    delivered: i32,
    failed: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO news_delivery_logs (news_id, total, delivered, failed, finished_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(news_id)
    .bind(total)
    .bind(delivered)
    .bind(failed)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}
