use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::pagination::Pagination;

const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.is_staff, u.created_at";

pub async fn list(db: &PgPool, page: Pagination) -> anyhow::Result<(i64, Vec<User>)> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("count users")?;
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u ORDER BY u.username LIMIT $1 OFFSET $2",
        USER_COLUMNS
    ))
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(db)
    .await
    .context("list users")?;
    Ok((count, rows))
}

/// Authors the user follows, by username.
pub async fn followed_authors(
    db: &PgPool,
    user_id: Uuid,
    page: Pagination,
) -> anyhow::Result<(i64, Vec<User>)> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count subscriptions")?;
    let rows = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {}
          FROM subscriptions s
          JOIN users u ON u.id = s.author_id
         WHERE s.user_id = $1
         ORDER BY u.username
         LIMIT $2 OFFSET $3
        "#,
        USER_COLUMNS
    ))
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(db)
    .await
    .context("list subscriptions")?;
    Ok((count, rows))
}
