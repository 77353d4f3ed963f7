//! City name normalization for weather queries.

use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Strip diacritics and lower-case a city name.
///
/// The name is decomposed (NFD), every non-spacing mark is removed, the
/// remainder is recomposed (NFC) and finally lower-cased, so
/// `"São Paulo"` becomes `"sao paulo"`.
pub fn sanitize_city(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| c.general_category() != GeneralCategory::NonspacingMark)
        .nfc()
        .collect();

    stripped.to_lowercase()
}
