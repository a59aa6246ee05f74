use rand::{seq::SliceRandom, Rng};

use crate::{
    db::RegistryStore,
    error::AppResult,
    models::{ContentItem, RegistryKind},
    services::{exclusion::exclude_registered, poster::PosterEnricher, providers::CatalogProvider},
};

/// Message returned instead of recommendations when the user has no favorites yet
pub const NEEDS_FAVORITE_MESSAGE: &str = "Please add a favorite first.";

/// Registries a recommendation is filtered against, in lookup order
const EXCLUDED_REGISTRIES: [RegistryKind; 2] = [RegistryKind::Ignore, RegistryKind::Favorite];

/// Outcome of a recommend request
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    Items(Vec<ContentItem>),
    /// The user has nothing to seed a recommendation from
    NeedsFavorite,
}

/// Uniform random pick, `None` for an empty list
pub fn pick_seed<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    items.choose(rng)
}

/// Recommends items related to one of the user's favorites
///
/// Picks a random favorite as the seed, fetches related items from the catalog, drops anything
/// the user ignored or already favorited and fills in posters. Never calls the catalog when the
/// user has no favorites.
pub async fn recommend(
    store: &dyn RegistryStore,
    provider: &dyn CatalogProvider,
    enricher: &PosterEnricher,
    user_id: &str,
    source_id: &str,
) -> AppResult<Recommendation> {
    let favorites = store
        .list_all(RegistryKind::Favorite, user_id, source_id)
        .await?;

    let seed = {
        let mut rng = rand::thread_rng();
        pick_seed(&favorites, &mut rng).map(|entry| entry.item_id.clone())
    };

    let Some(seed) = seed else {
        tracing::info!(user_id, source_id, "No favorites to recommend from");
        return Ok(Recommendation::NeedsFavorite);
    };

    let related = provider.related(&seed).await?;
    let fetched = related.len();

    let remaining =
        exclude_registered(store, user_id, source_id, &EXCLUDED_REGISTRIES, related).await?;
    let items = enricher.enrich(remaining).await;

    tracing::info!(
        provider = provider.name(),
        seed = %seed,
        favorites = favorites.len(),
        fetched,
        returned = items.len(),
        "Recommendations generated"
    );

    Ok(Recommendation::Items(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRegistryStore;
    use crate::error::AppError;
    use crate::models::{ContentKind, ImageRef, ItemId, TmdbMedia};
    use crate::services::poster::MockPosterSource;
    use crate::services::providers::MockCatalogProvider;
    use mockall::predicate::eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn enricher() -> PosterEnricher {
        let mut posters = MockPosterSource::new();
        posters
            .expect_poster_path()
            .returning(|_, id| Ok(Some(format!("/{}.jpg", id))));
        PosterEnricher::new(
            Arc::new(posters),
            "https://image.tmdb.org/t/p".to_string(),
            "w200".to_string(),
        )
    }

    fn movie(id: u64) -> ContentItem {
        let mut item = ContentItem::new(id, ContentKind::Movie, format!("Movie {}", id));
        item.image_ref = Some(ImageRef {
            media: TmdbMedia::Movie,
            id: id + 1000,
        });
        item
    }

    #[test]
    fn test_pick_seed_empty_is_none() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty: Vec<u32> = Vec::new();
        assert_eq!(pick_seed(&empty, &mut rng), None);
    }

    #[test]
    fn test_pick_seed_always_picks_a_member() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = vec![10, 20, 30, 40];
        let mut seen = HashSet::new();

        for _ in 0..200 {
            let picked = pick_seed(&items, &mut rng).unwrap();
            assert!(items.contains(picked));
            seen.insert(*picked);
        }

        // 200 uniform draws over 4 items reach every item
        assert_eq!(seen.len(), items.len());
    }

    #[tokio::test]
    async fn test_no_favorites_skips_catalog() {
        let store = MemoryRegistryStore::new();
        let mut provider = MockCatalogProvider::new();
        provider.expect_related().times(0);

        let result = recommend(&store, &provider, &enricher(), "u1", "s1")
            .await
            .unwrap();

        assert_eq!(result, Recommendation::NeedsFavorite);
    }

    #[tokio::test]
    async fn test_recommend_excludes_and_enriches() {
        let store = MemoryRegistryStore::new();
        store
            .insert(RegistryKind::Favorite, "u1", "s1", &ItemId::Numeric(10))
            .await
            .unwrap();
        store
            .insert(RegistryKind::Ignore, "u1", "s1", &ItemId::Numeric(12))
            .await
            .unwrap();

        let mut provider = MockCatalogProvider::new();
        provider
            .expect_related()
            .with(eq(ItemId::Numeric(10)))
            .times(1)
            .returning(|_| Ok(vec![movie(11), movie(12), movie(10), movie(13)]));
        provider.expect_name().return_const("trakt");

        let result = recommend(&store, &provider, &enricher(), "u1", "s1")
            .await
            .unwrap();

        let Recommendation::Items(items) = result else {
            panic!("expected items");
        };
        let ids: Vec<ItemId> = items.iter().map(|item| item.id.clone()).collect();
        assert_eq!(ids, vec![ItemId::Numeric(11), ItemId::Numeric(13)]);
        assert_eq!(
            items[0].poster.as_deref(),
            Some("https://image.tmdb.org/t/p/w200/1011.jpg")
        );
    }

    #[tokio::test]
    async fn test_related_failure_fails_request() {
        let store = MemoryRegistryStore::new();
        store
            .insert(RegistryKind::Favorite, "u1", "s1", &ItemId::Numeric(1))
            .await
            .unwrap();

        let mut provider = MockCatalogProvider::new();
        provider
            .expect_related()
            .returning(|_| Err(AppError::UpstreamUnavailable("trakt down".to_string())));

        let result = recommend(&store, &provider, &enricher(), "u1", "s1").await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_favorites_of_other_sources_do_not_seed() {
        let store = MemoryRegistryStore::new();
        store
            .insert(RegistryKind::Favorite, "u1", "other", &ItemId::Numeric(1))
            .await
            .unwrap();

        let mut provider = MockCatalogProvider::new();
        provider.expect_related().times(0);

        let result = recommend(&store, &provider, &enricher(), "u1", "s1")
            .await
            .unwrap();
        assert_eq!(result, Recommendation::NeedsFavorite);
    }
}
