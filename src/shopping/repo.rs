use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::aggregate::IngredientLine;

/// Read side the aggregator pulls from.
#[async_trait]
pub trait ShoppingSource: Send + Sync {
    /// Recipes in the user's cart, in store order.
    async fn purchased_recipes(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>>;

    /// `None` when the recipe no longer exists.
    async fn recipe_lines(&self, recipe_id: Uuid) -> anyhow::Result<Option<Vec<IngredientLine>>>;
}

#[derive(Clone)]
pub struct PgShoppingSource {
    db: PgPool,
}

impl PgShoppingSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShoppingSource for PgShoppingSource {
    async fn purchased_recipes(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT p.recipe_id
              FROM purchases p
              LEFT JOIN recipes r ON r.id = p.recipe_id
             WHERE p.user_id = $1
             ORDER BY r.name NULLS LAST, p.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list purchases")?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn recipe_lines(&self, recipe_id: Uuid) -> anyhow::Result<Option<Vec<IngredientLine>>> {
        let (found,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM recipes WHERE id = $1)")
            .bind(recipe_id)
            .fetch_one(&self.db)
            .await
            .context("lookup purchased recipe")?;
        if !found {
            return Ok(None);
        }

        let lines = sqlx::query_as::<_, IngredientLine>(
            r#"
            SELECT i.name, i.measurement_unit AS unit, ri.amount
              FROM recipe_ingredients ri
              JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = $1
             ORDER BY ri.position ASC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await
        .context("list recipe ingredient lines")?;
        Ok(Some(lines))
    }
}
