use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the caller's user id, set by the upstream authorizer
pub const USER_ID_HEADER: &str = "x-user-id";

/// Comma-separated groups of the caller, set by the upstream authorizer
pub const USER_GROUPS_HEADER: &str = "x-user-groups";

/// The authenticated caller
///
/// Rejects with `Unauthenticated` when no user id is present. Use `Option<CurrentUser>` for
/// routes that also serve anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub groups: Vec<String>,
}

impl CurrentUser {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(USER_ID_HEADER).ok_or(AppError::Unauthenticated)?;
        let groups = header(USER_GROUPS_HEADER)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|group| !group.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id: id.to_string(),
            groups,
        })
    }
}
