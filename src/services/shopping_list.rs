use std::{collections::HashMap, fmt::Write, sync::Arc};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    constants::SHOPPING_LIST_SUFFIX,
    error::Error,
    schema::{Id, IngredientLine},
    store::EntityStore,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub amount: i64,
    pub unit: String,
}

/// Ingredients needed for every recipe in a cart, one item per ingredient name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    /// Groups lines by ingredient name, keeping first-seen order. Amounts are
    /// summed and the unit of the last line in a group wins.
    pub fn from_lines(lines: impl IntoIterator<Item = IngredientLine>) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut items: Vec<ShoppingListItem> = vec![];

        for line in lines {
            match positions.get(&line.name) {
                Some(index) => {
                    let item = &mut items[*index];
                    item.amount += i64::from(line.amount);
                    item.unit = line.measurement_unit;
                }
                None => {
                    positions.insert(line.name.to_owned(), items.len());
                    items.push(ShoppingListItem {
                        name: line.name,
                        amount: i64::from(line.amount),
                        unit: line.measurement_unit,
                    });
                }
            }
        }

        Self { items }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShoppingListItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One `name: amount unit` line per item.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for item in self.iter() {
            // writing into a String cannot fail
            let _ = writeln!(out, "{}: {} {}", item.name, item.amount, item.unit);
        }
        out
    }

    pub fn attachment_name(username: &str, date: NaiveDate) -> String {
        format!(
            "{username}_{SHOPPING_LIST_SUFFIX}_{}.txt",
            date.format("%Y-%m-%d")
        )
    }
}

impl IntoIterator for ShoppingList {
    type Item = ShoppingListItem;
    type IntoIter = std::vec::IntoIter<ShoppingListItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ShoppingList {
    type Item = &'a ShoppingListItem;
    type IntoIter = std::slice::Iter<'a, ShoppingListItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Clone)]
pub struct ShoppingListAggregator {
    store: Arc<dyn EntityStore>,
}

impl ShoppingListAggregator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Recomputed from the cart on every call.
    pub async fn build_list(&self, user: Id) -> Result<ShoppingList, Error> {
        let lines = self.store.cart_lines(user).await?;
        Ok(ShoppingList::from_lines(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::RelationKind, services::fixtures};

    fn line(name: &str, amount: i32, unit: &str) -> IngredientLine {
        IngredientLine {
            recipe_id: 1,
            ingredient_id: 1,
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    #[test]
    fn merges_by_name_in_first_seen_order() {
        let list = ShoppingList::from_lines(vec![
            line("Sugar", 50, "g"),
            line("Flour", 200, "g"),
            line("Sugar", 25, "g"),
            line("Milk", 1, "l"),
        ]);

        let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Sugar", "Flour", "Milk"]);
        assert_eq!(list.iter().next().unwrap().amount, 75);
    }

    #[test]
    fn last_unit_wins() {
        let list = ShoppingList::from_lines(vec![line("Salt", 1, "tsp"), line("Salt", 5, "g")]);

        assert_eq!(
            list.into_iter().collect::<Vec<_>>(),
            vec![ShoppingListItem {
                name: String::from("Salt"),
                amount: 6,
                unit: String::from("g"),
            }]
        );
    }

    #[test]
    fn renders_one_line_per_item() {
        let list = ShoppingList::from_lines(vec![line("Flour", 300, "g"), line("Eggs", 2, "pcs")]);

        assert_eq!(list.render_text(), "Flour: 300 g\nEggs: 2 pcs\n");
    }

    #[test]
    fn attachment_name_has_user_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        assert_eq!(
            ShoppingList::attachment_name("cook", date),
            "cook_shopping_list_2024-03-09.txt"
        );
    }

    #[tokio::test]
    async fn empty_cart_gives_empty_list() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;

        let list = ShoppingListAggregator::new(store)
            .build_list(cook.id)
            .await
            .unwrap();

        assert!(list.is_empty());
        assert_eq!(list.render_text(), "");
    }

    #[tokio::test]
    async fn sums_across_cart_regardless_of_order() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let flour = fixtures::ingredient(&store, "Flour", "g").await;
        let eggs = fixtures::ingredient(&store, "Eggs", "pcs").await;
        let a = fixtures::recipe(&store, &cook, "Bread", &[], &[(flour.id, 200)]).await;
        let b = fixtures::recipe(&store, &cook, "Cake", &[], &[(flour.id, 100), (eggs.id, 3)]).await;

        for (first, second) in [(a.id, b.id), (b.id, a.id)] {
            let shopper = fixtures::user(&store, &format!("shopper{first}")).await;
            store
                .insert_relation(RelationKind::Cart, shopper.id, first)
                .await
                .unwrap();
            store
                .insert_relation(RelationKind::Cart, shopper.id, second)
                .await
                .unwrap();

            let list = ShoppingListAggregator::new(store.clone())
                .build_list(shopper.id)
                .await
                .unwrap();

            let flour_item = list.iter().find(|i| i.name == "Flour").unwrap();
            assert_eq!(flour_item.amount, 300);
            assert_eq!(list.len(), 2);
        }
    }

    #[tokio::test]
    async fn distinct_ingredients_sharing_a_name_are_merged() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let one = fixtures::ingredient(&store, "Butter", "g").await;
        let two = fixtures::ingredient(&store, "Butter", "g").await;
        let recipe = fixtures::recipe(&store, &cook, "Roux", &[], &[(one.id, 10), (two.id, 15)]).await;
        store
            .insert_relation(RelationKind::Cart, cook.id, recipe.id)
            .await
            .unwrap();

        let list = ShoppingListAggregator::new(store)
            .build_list(cook.id)
            .await
            .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().amount, 25);
    }

    #[tokio::test]
    async fn list_is_recomputed_on_every_call() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let rice = fixtures::ingredient(&store, "Rice", "g").await;
        let recipe = fixtures::recipe(&store, &cook, "Pilaf", &[], &[(rice.id, 150)]).await;
        let aggregator = ShoppingListAggregator::new(store.clone());

        store
            .insert_relation(RelationKind::Cart, cook.id, recipe.id)
            .await
            .unwrap();
        assert_eq!(aggregator.build_list(cook.id).await.unwrap().len(), 1);

        store
            .delete_relation(RelationKind::Cart, cook.id, recipe.id)
            .await
            .unwrap();
        assert!(aggregator.build_list(cook.id).await.unwrap().is_empty());
    }
}
