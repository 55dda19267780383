use tracing::{debug, warn};
use uuid::Uuid;

use super::aggregate::{aggregate, ShoppingList};
use super::repo::ShoppingSource;

/// Builds the consolidated list for one user's cart. Recipes deleted
/// between the cart lookup and the ingredient lookup are skipped.
pub async fn collect<S>(source: &S, user_id: Uuid) -> anyhow::Result<ShoppingList>
where
    S: ShoppingSource + ?Sized,
{
    let recipes = source.purchased_recipes(user_id).await?;
    debug!(%user_id, recipes = recipes.len(), "collecting shopping list");

    let mut lines = Vec::new();
    for recipe_id in recipes {
        match source.recipe_lines(recipe_id).await? {
            Some(rows) => lines.extend(rows),
            None => warn!(%user_id, %recipe_id, "purchased recipe vanished; skipping"),
        }
    }
    let list = aggregate(lines);
    for c in list.unit_conflicts() {
        warn!(%user_id, ingredient = %c.name, kept = %c.kept, ignored = %c.ignored, "unit mismatch while merging");
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::shopping::aggregate::IngredientLine;

    #[derive(Default)]
    struct MemorySource {
        carts: HashMap<Uuid, Vec<Uuid>>,
        recipes: HashMap<Uuid, Vec<IngredientLine>>,
    }

    #[async_trait]
    impl ShoppingSource for MemorySource {
        async fn purchased_recipes(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
            Ok(self.carts.get(&user_id).cloned().unwrap_or_default())
        }
        async fn recipe_lines(&self, recipe_id: Uuid) -> anyhow::Result<Option<Vec<IngredientLine>>> {
            Ok(self.recipes.get(&recipe_id).cloned())
        }
    }

    #[tokio::test]
    async fn empty_cart_gives_empty_list() {
        let source = MemorySource::default();
        let list = collect(&source, Uuid::new_v4()).await.unwrap();
        assert!(list.is_empty());
        assert_eq!(list.to_string(), "");
    }

    #[tokio::test]
    async fn merges_across_recipes_and_skips_deleted() {
        let user = Uuid::new_v4();
        let (cake, cookies, gone) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut source = MemorySource::default();
        source.carts.insert(user, vec![cake, gone, cookies]);
        source.recipes.insert(
            cake,
            vec![
                IngredientLine::new("Sugar", "g", 100),
                IngredientLine::new("Flour", "g", 300),
            ],
        );
        source.recipes.insert(
            cookies,
            vec![
                IngredientLine::new("Butter", "g", 80),
                IngredientLine::new("Sugar", "g", 50),
            ],
        );

        let list = collect(&source, user).await.unwrap();
        assert_eq!(
            list.to_string(),
            "Sugar (g) — 150\nFlour (g) — 300\nButter (g) — 80\n"
        );
    }

    #[tokio::test]
    async fn unit_mismatch_across_recipes_is_recorded() {
        let user = Uuid::new_v4();
        let (tea, jam) = (Uuid::new_v4(), Uuid::new_v4());
        let mut source = MemorySource::default();
        source.carts.insert(user, vec![tea, jam]);
        source.recipes.insert(tea, vec![IngredientLine::new("Sugar", "g", 10)]);
        source.recipes.insert(jam, vec![IngredientLine::new("Sugar", "kg", 1)]);

        let list = collect(&source, user).await.unwrap();
        assert_eq!(list.to_string(), "Sugar (g) — 11\n");
        assert_eq!(list.unit_conflicts().len(), 1);
        assert_eq!(list.unit_conflicts()[0].ignored, "kg");
    }

    #[tokio::test]
    async fn recipe_without_ingredients_contributes_nothing() {
        let user = Uuid::new_v4();
        let bare = Uuid::new_v4();
        let mut source = MemorySource::default();
        source.carts.insert(user, vec![bare]);
        source.recipes.insert(bare, Vec::new());

        let list = collect(&source, user).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let user = Uuid::new_v4();
        let soup = Uuid::new_v4();
        let mut source = MemorySource::default();
        source.carts.insert(user, vec![soup]);
        source.recipes.insert(
            soup,
            vec![
                IngredientLine::new("Carrot", "pcs", 2),
                IngredientLine::new("Onion", "pcs", 1),
            ],
        );

        let first = collect(&source, user).await.unwrap().to_string();
        let second = collect(&source, user).await.unwrap().to_string();
        assert_eq!(first, second);
    }
}
