/// User-owned association rows that share the add/remove toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Recipe in the user's shopping cart.
    Purchase,
    Favorite,
    /// User following an author.
    Subscription,
}

impl RelationKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Purchase => "purchases",
            Self::Favorite => "favorites",
            Self::Subscription => "subscriptions",
        }
    }

    pub fn subject_column(self) -> &'static str {
        match self {
            Self::Purchase | Self::Favorite => "recipe_id",
            Self::Subscription => "author_id",
        }
    }

    pub fn subject_table(self) -> &'static str {
        match self {
            Self::Purchase | Self::Favorite => "recipes",
            Self::Subscription => "users",
        }
    }

    /// Noun used in "not found" messages for a missing subject.
    pub fn subject_noun(self) -> &'static str {
        match self {
            Self::Purchase | Self::Favorite => "recipe",
            Self::Subscription => "user",
        }
    }

    pub fn forbids_self(self) -> bool {
        matches!(self, Self::Subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_subscriptions_forbid_self_target() {
        assert!(RelationKind::Subscription.forbids_self());
        assert!(!RelationKind::Purchase.forbids_self());
        assert!(!RelationKind::Favorite.forbids_self());
    }

    #[test]
    fn recipe_relations_point_at_recipes() {
        for kind in [RelationKind::Purchase, RelationKind::Favorite] {
            assert_eq!(kind.subject_table(), "recipes");
            assert_eq!(kind.subject_column(), "recipe_id");
        }
        assert_eq!(RelationKind::Subscription.subject_column(), "author_id");
    }
}
