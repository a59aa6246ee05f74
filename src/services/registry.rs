use uuid::Uuid;

use crate::{
    db::RegistryStore,
    error::{AppError, AppResult},
    models::{ItemId, RegistryKind},
};

/// Outcome of adding an item to a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(Uuid),
    AlreadyRegistered,
}

/// Message returned when the item is already in the registry
pub fn already_registered_message(registry: RegistryKind) -> String {
    format!("Item has already been added to your {}", registry.label())
}

/// Adds an item to a registry unless it is already there
///
/// Checks first, then inserts. A concurrent insert that wins the race surfaces from the store
/// as `ConflictIgnored` and is reported the same way as the pre-check.
pub async fn register(
    store: &dyn RegistryStore,
    registry: RegistryKind,
    user_id: &str,
    source_id: &str,
    item_id: &ItemId,
) -> AppResult<Registration> {
    if store.exists(registry, user_id, source_id, item_id).await? {
        return Ok(Registration::AlreadyRegistered);
    }

    match store.insert(registry, user_id, source_id, item_id).await {
        Ok(id) => {
            tracing::info!(
                registry = registry.as_str(),
                entry_id = %id,
                item_id = %item_id,
                "Registry entry created"
            );
            Ok(Registration::Created(id))
        }
        Err(AppError::ConflictIgnored) => Ok(Registration::AlreadyRegistered),
        Err(e) => Err(e),
    }
}
