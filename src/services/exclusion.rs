use crate::{
    db::RegistryStore,
    error::{AppError, AppResult},
    models::{ContentItem, ItemId, RegistryKind},
};

/// Drops every candidate already present in one of `registries`
///
/// Registries are consulted in the given order, each one only for the candidates that survived
/// the previous one. Survivors keep their relative order. A failed lookup fails the whole filter.
pub async fn exclude_registered(
    store: &dyn RegistryStore,
    user_id: &str,
    source_id: &str,
    registries: &[RegistryKind],
    candidates: Vec<ContentItem>,
) -> AppResult<Vec<ContentItem>> {
    let mut remaining = candidates;

    for &registry in registries {
        if remaining.is_empty() {
            break;
        }

        let ids: Vec<ItemId> = remaining.iter().map(|item| item.id.clone()).collect();
        let registered = store
            .existing_items(registry, user_id, source_id, &ids)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    registry = registry.as_str(),
                    "Registry lookup failed during exclusion"
                );
                AppError::UpstreamUnavailable(format!(
                    "{} registry lookup failed",
                    registry.as_str()
                ))
            })?;

        let before = remaining.len();
        remaining.retain(|item| !registered.contains(&item.id));

        tracing::debug!(
            registry = registry.as_str(),
            excluded = before - remaining.len(),
            remaining = remaining.len(),
            "Candidates filtered"
        );
    }

    Ok(remaining)
}
