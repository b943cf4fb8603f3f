//! Resolution of food image paths into loadable urls.

use crate::client::model::food::FoodItem;

/// shown when a food has no image
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/400x300?text=No+Image";

const API_SUFFIX: &str = "/api";

/// Turns a backend image path into an absolute url.
///
/// Absolute `http://` / `https://` urls pass through untouched. Anything else is appended to the
/// backend origin, which is `api_url` with its `/api` suffix stripped. Absent or blank paths give
/// `None`.
pub fn resolve_image_url(api_url: &str, image_path: Option<&str>) -> Option<String> {
    let path = image_path.map(str::trim).filter(|p| !p.is_empty())?;
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    let base = api_url.trim_end_matches('/');
    let origin = base.strip_suffix(API_SUFFIX).unwrap_or(base);
    let separator = if path.starts_with('/') { "" } else { "/" };
    Some(format!("{origin}{separator}{path}"))
}

pub fn image_url_or_placeholder(api_url: &str, food: &FoodItem) -> String {
    resolve_image_url(api_url, food.image_path.as_deref())
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string())
}
