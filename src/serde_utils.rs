//! Serde helpers for tool arguments.

use serde::{Deserialize, Deserializer};

/// Deserialize `Option<Option<T>>` so a missing field and an explicit `null`
/// stay distinguishable in partial updates.
///
/// - Missing field → `None` (requires `#[serde(default)]`)
/// - Field is `null` → `Some(None)`
/// - Field has value → `Some(Some(value))`
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct UpdateArgs {
///     #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
///     category_id: Option<Option<String>>,
/// }
/// ```
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Treat blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
