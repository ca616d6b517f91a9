use std::sync::LazyLock;

use fancy_regex::Regex;

/// Hebrew, Arabic, Syriac, Thaana, the RTL marks/embeddings and the Arabic
/// presentation forms.
pub static RTL_CHARS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{0591}-\x{07FF}\x{200F}\x{202B}\x{202E}\x{FB1D}-\x{FDFD}\x{FE70}-\x{FEFC}]")
        .unwrap()
});
