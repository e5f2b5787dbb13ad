use std::sync::Arc;

use crate::{
    api::models::Presenter,
    config::Settings,
    schema::Id,
    services::{
        composer::RecipeComposer, filters::RecipeFinder, images::ImageStore,
        relations::RelationshipManager, shopping_list::ShoppingListAggregator,
    },
    store::EntityStore,
};

/// Everything a request handler needs, cloned into every route.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn EntityStore>,
    pub settings: Arc<Settings>,
    pub secret: Arc<str>,
    pub relations: RelationshipManager,
    pub composer: RecipeComposer,
    pub finder: RecipeFinder,
    pub shopping: ShoppingListAggregator,
}

impl Context {
    pub fn new(store: Arc<dyn EntityStore>, settings: Settings) -> Self {
        let images = ImageStore::new(settings.media_root.clone());

        Self {
            relations: RelationshipManager::new(store.clone()),
            composer: RecipeComposer::new(store.clone(), settings.bounds, images),
            finder: RecipeFinder::new(store.clone(), settings.page_size),
            shopping: ShoppingListAggregator::new(store.clone()),
            secret: Arc::from(settings.secret.as_str()),
            settings: Arc::new(settings),
            store,
        }
    }

    pub fn presenter(&self, requester: Option<Id>) -> Presenter<'_> {
        Presenter::new(self.store.as_ref(), &self.settings.media_url, requester)
    }
}
