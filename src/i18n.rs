use crate::state::AppState;
use tracing::debug;

/// Languages compiled from `locales/`. The first entry is the fallback.
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "is"];

/// Switch the UI language from a host locale tag.
pub fn update_locale(state: &mut AppState, tag: &str) {
    let locale = normalize_locale(tag);
    if state.locale != locale {
        debug!(tag, locale, "locale changed");
    }
    state.locale = locale.to_string();
    rust_i18n::set_locale(locale);
}

/// `is-IS`, `is_IS.UTF-8` and `IS` all select Icelandic; anything we have no
/// strings for selects the fallback.
fn normalize_locale(tag: &str) -> &'static str {
    let language = tag
        .trim()
        .split(['-', '_', '.', '@'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|supported| *supported == language)
        .unwrap_or(SUPPORTED_LOCALES[0])
}
