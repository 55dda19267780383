use std::collections::HashMap;
use std::fmt;

use sqlx::FromRow;

/// One ingredient row of a purchased recipe, with the ingredient resolved.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct IngredientLine {
    pub name: String,
    pub unit: String,
    pub amount: i32,
}

#[cfg(test)]
impl IngredientLine {
    pub fn new(name: &str, unit: &str, amount: i32) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub unit: String,
    pub amount: i64,
}

/// A row whose unit disagreed with the unit already stored for that name.
/// Its amount was still added; `kept` is the unit shown on the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConflict {
    pub name: String,
    pub kept: String,
    pub ignored: String,
}

/// Consolidated list keyed by ingredient name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    items: Vec<ShoppingItem>,
    index: HashMap<String, usize>,
    unit_conflicts: Vec<UnitConflict>,
}

impl ShoppingList {
    pub fn add(&mut self, line: IngredientLine) {
        let IngredientLine { name, unit, amount } = line;
        match self.index.get(&name).copied() {
            Some(pos) => {
                let item = &mut self.items[pos];
                item.amount += i64::from(amount);
                if item.unit != unit {
                    self.unit_conflicts.push(UnitConflict {
                        name,
                        kept: item.unit.clone(),
                        ignored: unit,
                    });
                }
            }
            None => {
                self.index.insert(name.clone(), self.items.len());
                self.items.push(ShoppingItem {
                    name,
                    unit,
                    amount: i64::from(amount),
                });
            }
        }
    }

    pub fn unit_conflicts(&self) -> &[UnitConflict] {
        &self.unit_conflicts
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Extend<IngredientLine> for ShoppingList {
    fn extend<T: IntoIterator<Item = IngredientLine>>(&mut self, iter: T) {
        for line in iter {
            self.add(line);
        }
    }
}

/// One `name (unit) — amount` line per item, newline terminated, no header.
impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{} ({}) — {}", item.name, item.unit, item.amount)?;
        }
        Ok(())
    }
}

pub fn aggregate<I>(lines: I) -> ShoppingList
where
    I: IntoIterator<Item = IngredientLine>,
{
    let mut list = ShoppingList::default();
    list.extend(lines);
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_empty_report() {
        let list = aggregate(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list.to_string(), "");
    }

    #[test]
    fn single_recipe_keeps_row_order() {
        let list = aggregate(vec![
            IngredientLine::new("Flour", "g", 200),
            IngredientLine::new("Salt", "g", 5),
        ]);
        assert_eq!(list.to_string(), "Flour (g) — 200\nSalt (g) — 5\n");
    }

    #[test]
    fn shared_ingredient_is_summed_once() {
        let list = aggregate(vec![
            IngredientLine::new("Sugar", "g", 100),
            IngredientLine::new("Milk", "ml", 250),
            IngredientLine::new("Sugar", "g", 50),
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.items[list.index["Sugar"]].amount, 150);
        assert_eq!(list.to_string(), "Sugar (g) — 150\nMilk (ml) — 250\n");
        assert!(list.unit_conflicts().is_empty());
    }

    #[test]
    fn sum_over_many_recipes() {
        let amounts = [3, 7, 11, 13, 1];
        let list = aggregate(amounts.iter().map(|&a| IngredientLine::new("Egg", "pcs", a)));
        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0].amount, amounts.iter().map(|&a| i64::from(a)).sum::<i64>());
    }

    #[test]
    fn first_seen_unit_wins_and_mismatch_is_recorded() {
        let list = aggregate(vec![
            IngredientLine::new("Sugar", "g", 100),
            IngredientLine::new("Sugar", "kg", 1),
        ]);
        assert_eq!(list.to_string(), "Sugar (g) — 101\n");
        assert_eq!(
            list.unit_conflicts(),
            &[UnitConflict {
                name: "Sugar".into(),
                kept: "g".into(),
                ignored: "kg".into(),
            }]
        );
    }

    #[test]
    fn large_amounts_do_not_overflow() {
        let list = aggregate(vec![
            IngredientLine::new("Water", "ml", i32::MAX),
            IngredientLine::new("Water", "ml", i32::MAX),
        ]);
        assert_eq!(list.items[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn names_are_case_sensitive_keys() {
        let list = aggregate(vec![
            IngredientLine::new("salt", "g", 1),
            IngredientLine::new("Salt", "g", 2),
        ]);
        assert_eq!(list.len(), 2);
    }
}
