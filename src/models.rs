use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for paging the index action.
///
/// Standard REST format: `page=2&per_page=25`. Pages are 1-based; `per_page` is capped
/// by the controller's `max_per_page`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Number of items per page.
    #[param(example = 25)]
    pub per_page: Option<u64>,
}

/// Paging view object attached to the index response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Datatable {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
    pub total: u64,
    /// Value for the `Content-Range` header, e.g. `posts 0-24/120`
    pub content_range: String,
}

/// Body returned by bulk (collection) actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CollectionActionPayload {
    /// Always 200 for a completed bulk action, even when some resources failed
    #[schema(example = 200)]
    pub status: u16,
    #[schema(example = "Successfully archived 3 / 5 selected posts")]
    pub message: String,
}
