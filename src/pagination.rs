use axum::http::header::HeaderMap;

use crate::context::RequestContext;
use crate::models::{Datatable, PageParams};

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Content-Range value, e.g. `posts 0-9/42`.
#[must_use]
pub fn content_range(offset: u64, limit: u64, total_count: u64, resource_name: &str) -> String {
    let max_offset_limit = offset.saturating_add(limit.max(1) - 1).min(total_count);
    let safe_name = sanitize_resource_name(resource_name);
    format!("{safe_name} {offset}-{max_offset_limit}/{total_count}")
}

/// Function to calculate the total count and generate the Content-Range header.
///
/// If the resource name contains invalid header characters, it will be sanitized.
#[must_use]
pub fn calculate_content_range(
    offset: u64,
    limit: u64,
    total_count: u64,
    resource_name: &str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = content_range(offset, limit, total_count, resource_name).parse() {
        headers.insert("Content-Range", value);
    }
    headers
}

/// Reads `page` and `per_page` from request params, ignoring unparsable values.
#[must_use]
pub fn page_params(request: &RequestContext) -> PageParams {
    PageParams {
        page: request.param("page").and_then(|p| p.parse().ok()),
        per_page: request.param("per_page").and_then(|p| p.parse().ok()),
    }
}

/// Returns `(offset, limit)` for 1-based pages.
#[must_use]
pub fn parse_pagination(params: &PageParams, default_per_page: u64, max_per_page: u64) -> (u64, u64) {
    let limit = params
        .per_page
        .unwrap_or(default_per_page)
        .clamp(1, max_per_page.max(1));
    let page = params.page.unwrap_or(1).max(1);
    (page.saturating_sub(1).saturating_mul(limit), limit)
}

#[must_use]
pub fn datatable(
    params: &PageParams,
    default_per_page: u64,
    max_per_page: u64,
    total: u64,
    resource_name: &str,
) -> Datatable {
    let (offset, limit) = parse_pagination(params, default_per_page, max_per_page);
    Datatable {
        page: params.page.unwrap_or(1).max(1),
        per_page: limit,
        offset,
        total,
        content_range: content_range(offset, limit, total, resource_name),
    }
}
