pub mod animal;
pub mod auth;
pub mod calendar;
pub mod health_event;
pub mod owner;
pub mod reminder;
pub mod weight;

/// Canonical form of a free-form UI value: trimmed, lowercased, accents
/// stripped, spaces and dashes folded to `_`.
pub(crate) fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}
