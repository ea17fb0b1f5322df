//! "Volgende" (next) navigation link discovery on TOC pages.

use scraper::{Html, Selector};
use url::Url;

/// Link text / title of the next-sitting navigation link.
const NEXT_LABEL: &str = "Volgende";

/// Locate the next TOC page linked from `html`, resolved against `base`.
///
/// Prefers an anchor titled "Volgende"; falls back to the first anchor whose
/// text mentions it (case-insensitive).
pub fn find_next_link(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);

    let titled = Selector::parse(r#"a[title="Volgende"][href]"#).expect("valid selector");
    let href = doc
        .select(&titled)
        .next()
        .and_then(|el| el.value().attr("href"))
        .or_else(|| {
            let anchors = Selector::parse("a[href]").expect("valid selector");
            let needle = NEXT_LABEL.to_lowercase();
            doc.select(&anchors)
                .find(|el| el.text().collect::<String>().to_lowercase().contains(&needle))
                .and_then(|el| el.value().attr("href"))
        })?;

    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    base.join(href).ok()
}
