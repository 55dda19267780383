use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::kind::RelationKind;

/// Persistence behind the relation toggle.
#[async_trait]
pub trait RelationStore: Send + Sync {
    async fn subject_exists(&self, kind: RelationKind, subject_id: Uuid) -> anyhow::Result<bool>;

    /// Returns `false` when the row already existed.
    async fn insert(&self, kind: RelationKind, user_id: Uuid, subject_id: Uuid)
        -> anyhow::Result<bool>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, kind: RelationKind, user_id: Uuid, subject_id: Uuid)
        -> anyhow::Result<bool>;

    async fn exists(&self, kind: RelationKind, user_id: Uuid, subject_id: Uuid)
        -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgRelationStore {
    db: PgPool,
}

impl PgRelationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RelationStore for PgRelationStore {
    async fn subject_exists(&self, kind: RelationKind, subject_id: Uuid) -> anyhow::Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
            kind.subject_table()
        );
        let (found,): (bool,) = sqlx::query_as(&sql)
            .bind(subject_id)
            .fetch_one(&self.db)
            .await
            .with_context(|| format!("lookup {} {}", kind.subject_noun(), subject_id))?;
        Ok(found)
    }

    async fn insert(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        subject_id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "INSERT INTO {table} (user_id, {col}) VALUES ($1, $2) \
             ON CONFLICT (user_id, {col}) DO NOTHING",
            table = kind.table(),
            col = kind.subject_column(),
        );
        match sqlx::query(&sql)
            .bind(user_id)
            .bind(subject_id)
            .execute(&self.db)
            .await
        {
            Ok(done) => Ok(done.rows_affected() == 1),
            // A concurrent insert of the same pair lost the race.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(e).with_context(|| format!("insert into {}", kind.table())),
        }
    }

    async fn delete(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        subject_id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.subject_column()
        );
        let done = sqlx::query(&sql)
            .bind(user_id)
            .bind(subject_id)
            .execute(&self.db)
            .await
            .with_context(|| format!("delete from {}", kind.table()))?;
        Ok(done.rows_affected() > 0)
    }

    async fn exists(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        subject_id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
            kind.table(),
            kind.subject_column()
        );
        let (found,): (bool,) = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(subject_id)
            .fetch_one(&self.db)
            .await
            .with_context(|| format!("check {}", kind.table()))?;
        Ok(found)
    }
}
