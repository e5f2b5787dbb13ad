use std::sync::Arc;

use crate::{
    error::Error,
    schema::{Id, Relation, RelationKind},
    store::EntityStore,
};

/// Adds and removes favorites, cart items and follows. One row per
/// `(kind, user, target)`; nobody follows themselves.
#[derive(Clone)]
pub struct RelationshipManager {
    store: Arc<dyn EntityStore>,
}

impl RelationshipManager {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn ensure_target(&self, kind: RelationKind, target: Id) -> Result<(), Error> {
        let exists = match kind {
            RelationKind::Favorite | RelationKind::Cart => {
                self.store.get_recipe(target).await?.is_some()
            }
            RelationKind::Follow => self.store.get_user(target).await?.is_some(),
        };

        if !exists {
            return Err(Error::not_found(kind.target_name()));
        }
        Ok(())
    }

    pub async fn add(&self, kind: RelationKind, user: Id, target: Id) -> Result<Relation, Error> {
        self.ensure_target(kind, target).await?;

        if kind == RelationKind::Follow && user == target {
            return Err(Error::SelfReferenceNotAllowed);
        }

        // the unique index decides races between concurrent adds
        match self.store.insert_relation(kind, user, target).await? {
            Some(relation) => {
                log::trace!("> {kind:?} added: user {user} -> {target}");
                Ok(relation)
            }
            None => Err(Error::AlreadyExists(kind.duplicate_message().to_owned())),
        }
    }

    pub async fn remove(&self, kind: RelationKind, user: Id, target: Id) -> Result<(), Error> {
        self.ensure_target(kind, target).await?;

        if !self.store.delete_relation(kind, user, target).await? {
            return Err(Error::NotFound(kind.missing_message().to_owned()));
        }

        log::trace!("> {kind:?} removed: user {user} -> {target}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    #[tokio::test]
    async fn favorite_twice_counts_once() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let reader = fixtures::user(&store, "reader").await;
        let recipe = fixtures::recipe(&store, &cook, "Soup", &[], &[]).await;
        let manager = RelationshipManager::new(store.clone());

        let relation = manager
            .add(RelationKind::Favorite, reader.id, recipe.id)
            .await
            .unwrap();
        assert_eq!(relation.target_id, recipe.id);

        let second = manager
            .add(RelationKind::Favorite, reader.id, recipe.id)
            .await;
        assert!(matches!(second, Err(Error::AlreadyExists(_))));
        assert_eq!(
            store
                .count_relations(RelationKind::Favorite, recipe.id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn self_follow_is_refused_without_writing() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let manager = RelationshipManager::new(store.clone());

        let result = manager.add(RelationKind::Follow, cook.id, cook.id).await;

        assert_eq!(result, Err(Error::SelfReferenceNotAllowed));
        assert!(!store
            .relation_exists(RelationKind::Follow, cook.id, cook.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn removing_missing_relation_is_not_found() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let other = fixtures::user(&store, "other").await;
        let recipe = fixtures::recipe(&store, &cook, "Soup", &[], &[]).await;
        let manager = RelationshipManager::new(store);

        for kind in [RelationKind::Favorite, RelationKind::Cart] {
            let result = manager.remove(kind, other.id, recipe.id).await;
            assert!(matches!(result, Err(Error::NotFound(_))), "{kind:?}");
        }
        let result = manager.remove(RelationKind::Follow, other.id, cook.id).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let manager = RelationshipManager::new(store);

        let favorite = manager.add(RelationKind::Favorite, cook.id, 404).await;
        let follow = manager.add(RelationKind::Follow, cook.id, 404).await;

        assert_eq!(favorite, Err(Error::not_found("Recipe")));
        assert_eq!(follow, Err(Error::not_found("User")));
    }

    #[tokio::test]
    async fn favorites_and_cart_are_independent() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let recipe = fixtures::recipe(&store, &cook, "Soup", &[], &[]).await;
        let manager = RelationshipManager::new(store.clone());

        manager
            .add(RelationKind::Favorite, cook.id, recipe.id)
            .await
            .unwrap();
        manager
            .add(RelationKind::Cart, cook.id, recipe.id)
            .await
            .unwrap();
        manager
            .remove(RelationKind::Favorite, cook.id, recipe.id)
            .await
            .unwrap();

        assert!(store
            .relation_exists(RelationKind::Cart, cook.id, recipe.id)
            .await
            .unwrap());
        assert!(!store
            .relation_exists(RelationKind::Favorite, cook.id, recipe.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn follow_then_unfollow() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let fan = fixtures::user(&store, "fan").await;
        let manager = RelationshipManager::new(store.clone());

        manager
            .add(RelationKind::Follow, fan.id, cook.id)
            .await
            .unwrap();
        let (followed, total) = store.followed_users(fan.id, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(followed[0].id, cook.id);

        manager
            .remove(RelationKind::Follow, fan.id, cook.id)
            .await
            .unwrap();
        assert_eq!(store.followed_users(fan.id, 0, 10).await.unwrap().1, 0);
    }
}
