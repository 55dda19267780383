use anyhow::Context;
use serde::Deserialize;

use super::kind::RelationKind;

/// User-facing strings for one relation kind.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSet {
    pub exists: String,
    pub not_found: String,
    pub deleted: String,
    #[serde(default)]
    pub myself: Option<String>,
}

impl MessageSet {
    fn new(exists: &str, not_found: &str, deleted: &str) -> Self {
        Self {
            exists: exists.into(),
            not_found: not_found.into(),
            deleted: deleted.into(),
            myself: None,
        }
    }
}

/// Message table built once at start-up and shared read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationMessages {
    pub purchase: MessageSet,
    pub favorite: MessageSet,
    pub subscription: MessageSet,
}

impl Default for RelationMessages {
    fn default() -> Self {
        Self {
            purchase: MessageSet::new(
                "Recipe is already in the shopping cart.",
                "Recipe is not in the shopping cart.",
                "Recipe removed from the shopping cart.",
            ),
            favorite: MessageSet::new(
                "Recipe is already in favorites.",
                "Recipe is not in favorites.",
                "Recipe removed from favorites.",
            ),
            subscription: MessageSet {
                myself: Some("You cannot subscribe to yourself.".into()),
                ..MessageSet::new(
                    "You are already subscribed to this user.",
                    "You are not subscribed to this user.",
                    "Subscription cancelled.",
                )
            },
        }
    }
}

impl RelationMessages {
    pub fn get(&self, kind: RelationKind) -> &MessageSet {
        match kind {
            RelationKind::Purchase => &self.purchase,
            RelationKind::Favorite => &self.favorite,
            RelationKind::Subscription => &self.subscription,
        }
    }

    pub fn myself(&self) -> &str {
        self.subscription
            .myself
            .as_deref()
            .unwrap_or("You cannot subscribe to yourself.")
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let messages: Self = serde_json::from_str(raw).context("parse relation messages")?;
        anyhow::ensure!(
            messages.subscription.myself.is_some(),
            "subscription messages must define `myself`"
        );
        Ok(messages)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read relation messages from {}", path))?;
        let messages = Self::from_json(&raw)?;
        tracing::info!(path, "relation messages loaded");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_kind() {
        let m = RelationMessages::default();
        assert_eq!(m.get(RelationKind::Purchase).exists, "Recipe is already in the shopping cart.");
        assert_eq!(m.get(RelationKind::Favorite).not_found, "Recipe is not in favorites.");
        assert_eq!(m.get(RelationKind::Subscription).deleted, "Subscription cancelled.");
        assert_eq!(m.myself(), "You cannot subscribe to yourself.");
    }

    #[test]
    fn loads_localized_table_from_json() {
        let raw = r#"{
            "purchase": {"exists": "Рецепт уже в списке покупок", "not_found": "Рецепта нет в списке покупок.", "deleted": "Рецепт удалён из списка покупок."},
            "favorite": {"exists": "Рецепт уже в избранном.", "not_found": "Рецепта нет в избранном.", "deleted": "Рецепт удалён из избранного."},
            "subscription": {"myself": "Нельзя подписаться на самого себя.", "exists": "Вы уже подписаны на этого пользователя.", "not_found": "Вы не подписаны на этого пользователя.", "deleted": "Подписка отменена."}
        }"#;
        let m = RelationMessages::from_json(raw).expect("valid table");
        assert_eq!(m.get(RelationKind::Favorite).exists, "Рецепт уже в избранном.");
        assert_eq!(m.myself(), "Нельзя подписаться на самого себя.");
    }

    #[test]
    fn rejects_table_without_self_target_message() {
        let raw = r#"{
            "purchase": {"exists": "a", "not_found": "b", "deleted": "c"},
            "favorite": {"exists": "a", "not_found": "b", "deleted": "c"},
            "subscription": {"exists": "a", "not_found": "b", "deleted": "c"}
        }"#;
        let err = RelationMessages::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("myself"));
    }
}
