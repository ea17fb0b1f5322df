//! Plain-text extraction for adopted-text content pages.
//!
//! Isolates the paragraphs of the configured content region, joins them and
//! runs a series of cleanup passes that strip procedural boilerplate. Extraction
//! fails soft: a page without usable text yields [`Extraction::Miss`] instead
//! of an error, so one bad page never aborts a crawl.

mod cleanup;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use adoptedtexts_shared::{AdoptedTextsError, ExtractConfig, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Why a page produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// The configured content container is absent from the page.
    NoContainer,
    /// The container holds no paragraph with text.
    NoParagraphs,
    /// Text remained but was too short after cleanup.
    TooShort,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoContainer => "content container not found",
            Self::NoParagraphs => "no paragraph text",
            Self::TooShort => "text too short after cleanup",
        };
        f.write_str(s)
    }
}

/// Result of extracting one content page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Cleaned plain text.
    Text(String),
    /// No usable text; the record for this page gets empty text.
    Miss(MissReason),
}

impl Extraction {
    /// The extracted text, or an empty string on a miss.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Miss(_) => String::new(),
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_))
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extracts cleaned Dutch text from content-page HTML.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    container: Selector,
    paragraph: Selector,
    min_text_len: usize,
}

impl TextExtractor {
    /// Build an extractor from config. Fails if the container selector is invalid.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let container = Selector::parse(&config.container_selector).map_err(|e| {
            AdoptedTextsError::config(format!(
                "invalid container_selector '{}': {e}",
                config.container_selector
            ))
        })?;

        Ok(Self {
            container,
            paragraph: Selector::parse("p").expect("valid selector"),
            min_text_len: config.min_text_len,
        })
    }

    /// Extract the text of the designated content region.
    #[instrument(skip_all, fields(html_len = html.len()))]
    pub fn extract(&self, html: &str) -> Extraction {
        let doc = Html::parse_document(html);

        let Some(container) = doc.select(&self.container).next() else {
            return Extraction::Miss(MissReason::NoContainer);
        };

        let paragraphs = self.paragraph_texts(container);
        if paragraphs.is_empty() {
            return Extraction::Miss(MissReason::NoParagraphs);
        }

        let cleaned = cleanup::run_pipeline(&paragraphs.join("\n"));
        let len = cleaned.chars().count();
        debug!(paragraphs = paragraphs.len(), len, "text cleaned");

        if len <= self.min_text_len {
            return Extraction::Miss(MissReason::TooShort);
        }

        Extraction::Text(cleaned)
    }

    /// Text of each non-empty `<p>`, with its text nodes trimmed and space-joined.
    fn paragraph_texts(&self, container: ElementRef<'_>) -> Vec<String> {
        container
            .select(&self.paragraph)
            .map(|p| {
                p.text()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|text| !text.is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TextExtractor {
        TextExtractor::new(&ExtractConfig::default()).expect("default config")
    }

    const ADOPTED_TEXT: &str = r#"<html><head><title>Aangenomen teksten</title></head>
        <body>
            <nav><a href="/">Home</a></nav>
            <p class="title">Aangenomen teksten - Woensdag 21 juli 1999</p>
            <p>Het Europees Parlement, <b>gezien</b> het voorstel van de Commissie (debat),</p>
            <p>   </p>
            <p>verzoekt zijn Voorzitter deze resolutie te doen toekomen aan de Raad en de Commissie.</p>
        </body></html>"#;

    #[test]
    fn extracts_and_cleans_paragraphs() {
        let extraction = extractor().extract(ADOPTED_TEXT);
        assert_eq!(
            extraction,
            Extraction::Text(
                "Aangenomen teksten - Woensdag 21 juli 1999 \
                 Het Europees Parlement, gezien het voorstel van de Commissie , \
                 verzoekt zijn Voorzitter deze resolutie te doen toekomen aan de Raad en de Commissie."
                    .into()
            )
        );
    }

    #[test]
    fn missing_container_is_a_miss() {
        let config = ExtractConfig {
            container_selector: "div.contents".into(),
            ..ExtractConfig::default()
        };
        let extractor = TextExtractor::new(&config).unwrap();
        let extraction = extractor.extract(ADOPTED_TEXT);
        assert_eq!(extraction, Extraction::Miss(MissReason::NoContainer));
        assert_eq!(extraction.into_text(), "");
    }

    #[test]
    fn container_restricts_paragraphs() {
        let html = r#"<html><body>
            <p>Navigatie en andere pagina-elementen buiten de inhoud van het document.</p>
            <div class="contents">
                <p>Het Europees Parlement keurt het gewijzigde voorstel van de Commissie goed.</p>
            </div>
        </body></html>"#;
        let config = ExtractConfig {
            container_selector: "div.contents".into(),
            ..ExtractConfig::default()
        };
        let extractor = TextExtractor::new(&config).unwrap();
        assert_eq!(
            extractor.extract(html),
            Extraction::Text(
                "Het Europees Parlement keurt het gewijzigde voorstel van de Commissie goed.".into()
            )
        );
    }

    #[test]
    fn page_without_paragraphs_is_a_miss() {
        let html = "<html><body><div>Geen alinea's</div></body></html>";
        assert_eq!(
            extractor().extract(html),
            Extraction::Miss(MissReason::NoParagraphs)
        );
    }

    #[test]
    fn short_text_is_a_miss() {
        let html = "<html><body><p>Het debat wordt gesloten.</p><p>Kort.</p></body></html>";
        let extraction = extractor().extract(html);
        assert_eq!(extraction, Extraction::Miss(MissReason::TooShort));
        assert!(extraction.is_miss());
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let config = ExtractConfig {
            container_selector: "div[".into(),
            ..ExtractConfig::default()
        };
        let err = TextExtractor::new(&config).unwrap_err();
        assert!(err.to_string().contains("invalid container_selector"));
    }
}
