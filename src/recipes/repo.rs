use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{IngredientAmount, RecipeFilter, RecipeIngredientRead};
use crate::pagination::Pagination;
use crate::relations::RelationKind;

#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: OffsetDateTime,
}

/// Scalar columns written on create and update.
pub struct RecipeFields<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub text: &'a str,
    pub cooking_time: i32,
}

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter, viewer: Option<Uuid>) {
    qb.push(" WHERE TRUE");
    if let Some(author) = filter.author {
        qb.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        )
        .push_bind(filter.tags.clone())
        .push("))");
    }
    for (flag, kind) in [
        (filter.is_favorited, RelationKind::Favorite),
        (filter.is_in_shopping_cart, RelationKind::Purchase),
    ] {
        if flag != Some(true) {
            continue;
        }
        match viewer {
            Some(user_id) => {
                qb.push(format!(
                    " AND EXISTS (SELECT 1 FROM {} x WHERE x.recipe_id = r.id AND x.user_id = ",
                    kind.table()
                ))
                .push_bind(user_id)
                .push(")");
            }
            // Anonymous callers have no favorites and no cart.
            None => {
                qb.push(" AND FALSE");
            }
        }
    }
}

pub async fn list(
    db: &PgPool,
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    page: Pagination,
) -> anyhow::Result<(i64, Vec<Recipe>)> {
    let mut count_q = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut count_q, filter, viewer);
    let count: i64 = count_q
        .build_query_scalar::<i64>()
        .fetch_one(db)
        .await
        .context("count recipes")?;

    let mut q = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM recipes r", RECIPE_COLUMNS));
    push_filters(&mut q, filter, viewer);
    q.push(" ORDER BY r.pub_date DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let rows = q
        .build_query_as::<Recipe>()
        .fetch_all(db)
        .await
        .context("list recipes")?;

    Ok((count, rows))
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {} FROM recipes r WHERE r.id = $1",
        RECIPE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get recipe")?;
    Ok(row)
}

pub async fn list_by_author(
    db: &PgPool,
    author_id: Uuid,
    limit: Option<i64>,
) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {} FROM recipes r WHERE r.author_id = $1 ORDER BY r.pub_date DESC LIMIT $2",
        RECIPE_COLUMNS
    ))
    .bind(author_id)
    // NULL means no limit
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list recipes by author")?;
    Ok(rows)
}

pub async fn count_by_author(db: &PgPool, author_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(db)
        .await
        .context("count recipes by author")?;
    Ok(count)
}

pub async fn ingredients_for(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<RecipeIngredientRead>> {
    let rows = sqlx::query_as::<_, RecipeIngredientRead>(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = $1
         ORDER BY ri.position ASC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
    .context("list recipe ingredients")?;
    Ok(rows)
}

async fn missing_ids(db: &PgPool, table: &str, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT x.id FROM UNNEST($1::uuid[]) AS x(id) \
         WHERE NOT EXISTS (SELECT 1 FROM {} t WHERE t.id = x.id)",
        table
    ))
    .bind(ids)
    .fetch_all(db)
    .await
    .with_context(|| format!("check {} ids", table))?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn missing_ingredients(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    missing_ids(db, "ingredients", ids).await
}

pub async fn missing_tags(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    missing_ids(db, "tags", ids).await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    author_id: Uuid,
    fields: &RecipeFields<'_>,
) -> anyhow::Result<Recipe> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes AS r (id, author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date
        "#,
    )
    .bind(id)
    .bind(author_id)
    .bind(fields.name)
    .bind(fields.image)
    .bind(fields.text)
    .bind(fields.cooking_time)
    .fetch_one(&mut **tx)
    .await
    .context("insert recipe")?;
    Ok(row)
}

/// Locks the row for the rest of the transaction.
pub async fn get_for_update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {} FROM recipes r WHERE r.id = $1 FOR UPDATE",
        RECIPE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("lock recipe")?;
    Ok(row)
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    fields: &RecipeFields<'_>,
) -> anyhow::Result<Recipe> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes AS r
           SET name = $2, image = $3, text = $4, cooking_time = $5
         WHERE r.id = $1
        RETURNING r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date
        "#,
    )
    .bind(id)
    .bind(fields.name)
    .bind(fields.image)
    .bind(fields.text)
    .bind(fields.cooking_time)
    .fetch_one(&mut **tx)
    .await
    .context("update recipe")?;
    Ok(row)
}

pub async fn replace_ingredients_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    items: &[IngredientAmount],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe ingredients")?;

    let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let amounts: Vec<i32> = items.iter().map(|i| i.amount).collect();
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, position)
        SELECT $1, x.ingredient_id, x.amount, (x.ord - 1)::int
          FROM UNNEST($2::uuid[], $3::int[]) WITH ORDINALITY AS x(ingredient_id, amount, ord)
        "#,
    )
    .bind(recipe_id)
    .bind(&ids)
    .bind(&amounts)
    .execute(&mut **tx)
    .await
    .context("insert recipe ingredients")?;
    Ok(())
}

pub async fn replace_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tag_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe tags")?;
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, t FROM UNNEST($2::uuid[]) AS t
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await
    .context("insert recipe tags")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(done.rows_affected() > 0)
}
