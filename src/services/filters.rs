use std::sync::Arc;

use crate::{
    error::Error,
    pagination::{Page, Pagination},
    schema::{Id, Recipe, RecipeQuery},
    store::EntityStore,
};

/// Recipe list filters as they arrive in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

impl RecipeFilter {
    /// Unknown keys are ignored so pagination parameters can share the query.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, Error> {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    let author = value.trim().parse::<Id>().map_err(|_| {
                        Error::InvalidRequest(format!("Invalid author id \"{value}\""))
                    })?;
                    filter.author = Some(author);
                }
                "tags" => {
                    if !filter.tags.contains(&value) {
                        filter.tags.push(value);
                    }
                }
                "is_favorited" => filter.is_favorited = flag(&value),
                "is_in_shopping_cart" => filter.is_in_shopping_cart = flag(&value),
                _ => {}
            }
        }

        Ok(filter)
    }

    pub fn needs_requester(&self) -> bool {
        self.is_favorited || self.is_in_shopping_cart
    }

    /// `None` when the filter can match nothing for this requester.
    pub fn to_query(&self, requester: Option<Id>) -> Option<RecipeQuery> {
        if self.needs_requester() && requester.is_none() {
            return None;
        }

        Some(RecipeQuery {
            author: self.author,
            tag_slugs: self.tags.clone(),
            favorited_by: requester.filter(|_| self.is_favorited),
            in_cart_of: requester.filter(|_| self.is_in_shopping_cart),
        })
    }
}

#[derive(Clone)]
pub struct RecipeFinder {
    store: Arc<dyn EntityStore>,
    page_size: i64,
}

impl RecipeFinder {
    pub fn new(store: Arc<dyn EntityStore>, page_size: i64) -> Self {
        Self { store, page_size }
    }

    /// Newest recipes first.
    pub async fn filter_recipes(
        &self,
        filter: &RecipeFilter,
        requester: Option<Id>,
        pagination: Pagination,
        path: &str,
    ) -> Result<Page<Recipe>, Error> {
        let Some(query) = filter.to_query(requester) else {
            return Ok(Page::no_rows());
        };

        let limit = pagination.limit(self.page_size);
        let offset = pagination.offset();
        let (rows, total) = self.store.query_recipes(&query, offset, limit).await?;

        Ok(Page::from_rows(
            rows,
            total,
            limit,
            offset,
            path,
            &pagination.params,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::RelationKind, services::fixtures};

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn names(page: &Page<Recipe>) -> Vec<&str> {
        page.results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn parses_query_pairs() {
        let filter = RecipeFilter::from_pairs(pairs(&[
            ("tags", "lunch"),
            ("tags", "dinner"),
            ("tags", "lunch"),
            ("author", "3"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "false"),
            ("limit", "2"),
        ]))
        .unwrap();

        assert_eq!(
            filter,
            RecipeFilter {
                author: Some(3),
                tags: vec![String::from("lunch"), String::from("dinner")],
                is_favorited: true,
                is_in_shopping_cart: false,
            }
        );
        assert!(RecipeFilter::from_pairs(pairs(&[("author", "me")])).is_err());
    }

    #[test]
    fn requester_flags_without_requester_match_nothing() {
        let filter = RecipeFilter {
            is_in_shopping_cart: true,
            ..Default::default()
        };

        assert!(filter.to_query(None).is_none());
        assert_eq!(filter.to_query(Some(7)).unwrap().in_cart_of, Some(7));
        assert!(RecipeFilter::default().to_query(None).is_some());
    }

    #[tokio::test]
    async fn tags_match_any() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let lunch = fixtures::tag(&store, "lunch").await;
        let dinner = fixtures::tag(&store, "dinner").await;
        let snack = fixtures::tag(&store, "snack").await;
        fixtures::recipe(&store, &cook, "Salad", &[lunch.id], &[]).await;
        fixtures::recipe(&store, &cook, "Stew", &[dinner.id, lunch.id], &[]).await;
        fixtures::recipe(&store, &cook, "Chips", &[snack.id], &[]).await;
        let finder = RecipeFinder::new(store, 6);

        let filter = RecipeFilter {
            tags: vec![String::from("lunch"), String::from("dinner")],
            ..Default::default()
        };
        let page = finder
            .filter_recipes(&filter, None, Pagination::default(), "/recipes/")
            .await
            .unwrap();

        assert_eq!(page.count, 2);
        assert_eq!(names(&page), ["Stew", "Salad"]);
    }

    #[tokio::test]
    async fn author_and_favorites_combine() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let baker = fixtures::user(&store, "baker").await;
        let soup = fixtures::recipe(&store, &cook, "Soup", &[], &[]).await;
        let bread = fixtures::recipe(&store, &baker, "Bread", &[], &[]).await;
        fixtures::recipe(&store, &cook, "Pie", &[], &[]).await;
        for recipe in [soup.id, bread.id] {
            store
                .insert_relation(RelationKind::Favorite, baker.id, recipe)
                .await
                .unwrap();
        }
        let finder = RecipeFinder::new(store, 6);

        let favorites = RecipeFilter {
            is_favorited: true,
            ..Default::default()
        };
        let page = finder
            .filter_recipes(&favorites, Some(baker.id), Pagination::default(), "/recipes/")
            .await
            .unwrap();
        assert_eq!(names(&page), ["Bread", "Soup"]);

        let by_cook = RecipeFilter {
            author: Some(cook.id),
            ..favorites
        };
        let page = finder
            .filter_recipes(&by_cook, Some(baker.id), Pagination::default(), "/recipes/")
            .await
            .unwrap();
        assert_eq!(names(&page), ["Soup"]);

        let anonymous = finder
            .filter_recipes(&by_cook, None, Pagination::default(), "/recipes/")
            .await
            .unwrap();
        assert_eq!(anonymous.count, 0);
    }

    #[tokio::test]
    async fn pages_through_results() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        for name in ["One", "Two", "Three"] {
            fixtures::recipe(&store, &cook, name, &[], &[]).await;
        }
        let finder = RecipeFinder::new(store, 2);

        let first = finder
            .filter_recipes(&RecipeFilter::default(), None, Pagination::default(), "/recipes/")
            .await
            .unwrap();
        let second = finder
            .filter_recipes(&RecipeFilter::default(), None, Pagination::new(2, 2), "/recipes/")
            .await
            .unwrap();

        assert_eq!(names(&first), ["Three", "Two"]);
        assert_eq!(first.next.as_deref(), Some("/recipes/?limit=2&offset=2"));
        assert_eq!(names(&second), ["One"]);
        assert_eq!(second.previous.as_deref(), Some("/recipes/?limit=2"));
    }
}
