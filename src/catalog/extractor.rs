//! Artwork detail page extraction
//!
//! Pulls the fields of an [`Artwork`] out of detail page markup:
//! - Title from the "<title> by <artist>" heading
//! - Description paragraphs following the description heading
//! - Price, size, medium and materials
//! - Availability and the primary image

use crate::catalog::artwork::Artwork;
use crate::catalog::traits::{ExtractError, FieldExtractor};
use crate::url::DEFAULT_ITEM_PATH_PREFIX;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Heading text introducing the description block
const DESCRIPTION_HEADING: &str = "description";

/// Text of the purchase button shown for available items
const ADD_TO_BASKET_TEXT: &str = "add to basket";

/// Extracts artworks from detail pages
#[derive(Debug, Clone)]
pub struct ArtworkExtractor {
    item_prefix: String,
    year_pattern: Regex,
    medium_pattern: Regex,
    price_pattern: Regex,
    sold_pattern: Regex,
}

impl ArtworkExtractor {
    /// Creates an extractor for items under `item_prefix`
    pub fn new(item_prefix: impl Into<String>) -> Result<Self, ExtractError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ExtractError::Pattern(e.to_string()))
        };

        Ok(Self {
            item_prefix: item_prefix.into(),
            // "(2023)" style year annotations
            year_pattern: compile(r"\(\s*\d{4}\s*\)")?,
            // Medium words trailing the title: "A Walk Oil painting"
            medium_pattern: compile(
                r"(?i)\b(?:oil|acrylic|mixed media|ink|watercolou?r|gouache|charcoal|pastel|print|painting|drawing|photograph|sculpture|artwork|original)\b.*$",
            )?,
            price_pattern: compile(r"£\s*[0-9][0-9,]*(?:\.[0-9]{1,2})?")?,
            sold_pattern: compile(r"(?i)\b(?:this artwork is sold|sold out|sold)\b")?,
        })
    }

    /// Creates an extractor for the default `/product/` prefix
    pub fn with_default_prefix() -> Result<Self, ExtractError> {
        Self::new(DEFAULT_ITEM_PATH_PREFIX)
    }

    fn extract_title(&self, document: &Html) -> Result<Option<String>, ExtractError> {
        let headers = selector("h1, h2")?;

        for header in document.select(&headers) {
            let text = collapse_whitespace(&header.text().collect::<String>());
            let Some((prefix, _artist)) = text.split_once(" by ") else {
                continue;
            };

            let without_year = self.year_pattern.replace_all(prefix, "");
            let without_medium = self.medium_pattern.replace(&without_year, "");
            let cleaned = collapse_whitespace(&without_medium);
            if !cleaned.is_empty() {
                return Ok(Some(cleaned));
            }
        }

        Ok(None)
    }

    fn extract_price(&self, document: &Html) -> Option<String> {
        document
            .root_element()
            .text()
            .find_map(|text| self.price_pattern.find(text))
            .map(|m| m.as_str().replace(char::is_whitespace, ""))
    }

    fn extract_sold(&self, document: &Html) -> Result<bool, ExtractError> {
        let page_text = body_text(document)?.to_lowercase();
        if self.sold_pattern.is_match(&page_text) {
            return Ok(true);
        }

        Ok(!page_text.contains(ADD_TO_BASKET_TEXT))
    }
}

impl FieldExtractor<Artwork> for ArtworkExtractor {
    fn extract(&self, html: &str, source_url: &Url) -> Result<Artwork, ExtractError> {
        let document = Html::parse_document(html);

        let title = self
            .extract_title(&document)?
            .ok_or(ExtractError::MissingField("title"))?;

        let mut artwork = Artwork::new(title, source_url.as_str());
        artwork.description = extract_description(&document)?;
        artwork.price_gbp = self.extract_price(&document);
        artwork.size = extract_attribute(&document, "size")?;
        artwork.medium = extract_attribute(&document, "medium")?;
        artwork.materials_used = extract_attribute(&document, "materials")?;
        artwork.sold = self.extract_sold(&document)?;
        artwork.image_url = extract_image_url(&document, &artwork.title, source_url)?;

        tracing::debug!("Extracted '{}' from {}", artwork.title, source_url);

        artwork.validate(&self.item_prefix)
    }
}

/// Collects the paragraphs following the description heading
///
/// Stops at the next major heading or the specifications panel. Paragraphs
/// are separated by blank lines; literal `\n` markers become line breaks.
fn extract_description(document: &Html) -> Result<Option<String>, ExtractError> {
    let headings = selector("h2, h3, h4, h5, h6, strong, dt")?;
    let paragraphs_selector = selector("p")?;

    for heading in document.select(&headings) {
        let label = collapse_whitespace(&heading.text().collect::<String>()).to_lowercase();
        if !label.contains(DESCRIPTION_HEADING) {
            continue;
        }

        let mut paragraphs = Vec::new();
        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            let name = sibling.value().name();
            if matches!(name, "h1" | "h2" | "h3") {
                break;
            }

            let sibling_text = collapse_whitespace(&sibling.text().collect::<String>());
            if sibling_text.to_lowercase().contains("specifications") {
                break;
            }

            if !matches!(name, "p" | "div" | "section") {
                continue;
            }

            let nested: Vec<String> = sibling
                .select(&paragraphs_selector)
                .map(|p| collapse_whitespace(&p.text().collect::<String>()))
                .filter(|p| !p.is_empty())
                .collect();

            if nested.is_empty() {
                if !sibling_text.is_empty() {
                    paragraphs.push(sibling_text);
                }
            } else {
                paragraphs.extend(nested);
            }
        }

        if !paragraphs.is_empty() {
            let combined = paragraphs.join("\n\n").replace("\\n", "\n");
            let lines: Vec<&str> = combined.split('\n').map(str::trim).collect();
            return Ok(Some(lines.join("\n").trim().to_string()));
        }
    }

    Ok(None)
}

/// Reads a labelled value from the `.product-attributes` panel
///
/// Handles both `<span>Size</span> 30 x 40 cm` and values embedded in the
/// label span itself (`<span>Size: 30 x 40 cm</span>`).
fn extract_attribute(document: &Html, label: &str) -> Result<Option<String>, ExtractError> {
    let spans = selector(".product-attributes span")?;

    for span in document.select(&spans) {
        let span_text = collapse_whitespace(&span.text().collect::<String>());
        if !span_text.to_lowercase().starts_with(label) {
            continue;
        }

        let mut sibling_texts = Vec::new();
        for sibling in span.next_siblings() {
            let text = match sibling.value() {
                Node::Text(text) => collapse_whitespace(text),
                Node::Element(_) => ElementRef::wrap(sibling)
                    .map(|e| collapse_whitespace(&e.text().collect::<String>()))
                    .unwrap_or_default(),
                _ => String::new(),
            };
            if !text.is_empty() {
                sibling_texts.push(text);
            }
        }

        let value = if sibling_texts.is_empty() {
            strip_label(&span_text, label)
        } else {
            sibling_texts
                .join(" ")
                .trim_start_matches(':')
                .trim()
                .to_string()
        };

        return Ok(Some(value).filter(|v| !v.is_empty()));
    }

    Ok(None)
}

/// Finds the primary image
///
/// Prefers the `og:image` meta tag, then an image whose alt text mentions the
/// title, then the first image on the page.
fn extract_image_url(
    document: &Html,
    title: &str,
    source_url: &Url,
) -> Result<Option<String>, ExtractError> {
    let og_image = selector("meta[property='og:image']")?;
    let images = selector("img[src]")?;

    let resolve = |raw: &str| -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        source_url.join(trimmed).ok().map(|u| u.to_string())
    };

    if let Some(url) = document
        .select(&og_image)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(resolve)
    {
        return Ok(Some(url));
    }

    let lowered_title = title.to_lowercase();
    let by_alt = document.select(&images).find(|img| {
        img.value()
            .attr("alt")
            .is_some_and(|alt| alt.to_lowercase().contains(&lowered_title))
    });
    if let Some(url) = by_alt.and_then(|img| img.value().attr("src")).and_then(resolve) {
        return Ok(Some(url));
    }

    Ok(document
        .select(&images)
        .filter_map(|img| img.value().attr("src"))
        .find_map(resolve))
}

fn body_text(document: &Html) -> Result<String, ExtractError> {
    let body = selector("body")?;
    let text = match document.select(&body).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };
    Ok(collapse_whitespace(&text))
}

/// Removes a leading label word and colon from "Size: 30 x 40 cm"
fn strip_label(text: &str, label: &str) -> String {
    let rest = text.get(label.len()..).unwrap_or_default();
    collapse_whitespace(rest.trim_start_matches(|c: char| c.is_alphabetic()))
        .trim_start_matches(':')
        .trim()
        .to_string()
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Pattern(format!("{}: {:?}", css, e)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVAILABLE_PAGE: &str = r#"
        <html>
          <head>
            <meta property="og:image" content="https://cdn.example.com/images/windswept-walk.jpg" />
          </head>
          <body>
            <h1>A Windswept Walk (2023) Oil painting by Lizzie Butler</h1>
            <div class="pricing">
              <span class="price">£475</span>
              <button type="button">Add to Basket</button>
            </div>
            <section>
              <h3>Original artwork description</h3>
              <p>This windswept walk captures the energy of the coastline.</p>
              <div>
                <p>Layers of oil paint bring movement to the clouds and surf.</p>
              </div>
              <h3>Specifications</h3>
              <p>Not part of the description</p>
            </section>
            <div class="product-attributes">
              <span>Size</span> 46 x 46 x 2cm (unframed)
            </div>
            <div class="product-attributes">
              <span>Medium</span><em>Oil on canvas</em>
            </div>
          </body>
        </html>
    "#;

    const SOLD_PAGE: &str = r#"
        <html>
          <body>
            <h2>Soft Light Kew Gardens, an atmospheric oil painting by Lizzie Butler</h2>
            <p class="status">This artwork is sold</p>
            <div class="product-attributes"><span>Size: 30 x 40 cm</span></div>
            <img src="/static/logo.png" alt="Site logo" />
            <img src="https://cdn.example.com/images/soft-light-main.jpg" alt="Soft Light Kew Gardens, an atmospheric" />
          </body>
        </html>
    "#;

    fn extractor() -> ArtworkExtractor {
        ArtworkExtractor::with_default_prefix().unwrap()
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://www.artfinder.com{}", path)).unwrap()
    }

    #[test]
    fn test_extract_available_item() {
        let artwork = extractor()
            .extract(AVAILABLE_PAGE, &url("/product/a-windswept-walk/"))
            .unwrap();

        assert_eq!(artwork.title, "A Windswept Walk");
        assert_eq!(artwork.slug, "a-windswept-walk");
        assert_eq!(
            artwork.description.as_deref(),
            Some(
                "This windswept walk captures the energy of the coastline.\n\n\
                 Layers of oil paint bring movement to the clouds and surf."
            )
        );
        assert_eq!(artwork.price_gbp.as_deref(), Some("475"));
        assert_eq!(artwork.size.as_deref(), Some("46 x 46 x 2cm (unframed)"));
        assert_eq!(artwork.medium.as_deref(), Some("Oil on canvas"));
        assert_eq!(artwork.materials_used, None);
        assert!(!artwork.sold);
        assert_eq!(
            artwork.image_url.as_deref(),
            Some("https://cdn.example.com/images/windswept-walk.jpg")
        );
    }

    #[test]
    fn test_extract_sold_item() {
        let artwork = extractor()
            .extract(SOLD_PAGE, &url("/product/soft-light-kew-gardens/"))
            .unwrap();

        assert_eq!(artwork.title, "Soft Light Kew Gardens, an atmospheric");
        assert!(artwork.sold);
        assert_eq!(artwork.price_gbp, None);
        assert_eq!(artwork.size.as_deref(), Some("30 x 40 cm"));
        assert_eq!(
            artwork.image_url.as_deref(),
            Some("https://cdn.example.com/images/soft-light-main.jpg")
        );
    }

    #[test]
    fn test_missing_add_to_basket_means_sold() {
        let html = "<html><body><h1>Quiet Harbour by Someone</h1><p>£900</p></body></html>";
        let artwork = extractor()
            .extract(html, &url("/product/quiet-harbour/"))
            .unwrap();
        assert!(artwork.sold);
        assert_eq!(artwork.price_gbp.as_deref(), Some("900"));
    }

    #[test]
    fn test_price_with_thousands_separator() {
        let html = r#"<html><body><h1>Big Sky by Someone</h1>
            <span>£1,250</span><button>Add to basket</button></body></html>"#;
        let artwork = extractor().extract(html, &url("/product/big-sky/")).unwrap();
        assert_eq!(artwork.price_gbp.as_deref(), Some("1250"));
        assert!(!artwork.sold);
    }

    #[test]
    fn test_size_embedded_in_label_span() {
        let html = r#"<html><body>
            <h1>Size Study (2022) Oil painting by Lizzie Butler</h1>
            <button>Add to Basket</button>
            <div class="product-attributes">
              <span>Size<!-- -->:<!-- --> 50 x 60 cm <!-- -->(framed)</span>
            </div>
            <img src="https://cdn.example.com/images/size-study.jpg" alt="Size Study painting by Lizzie Butler" />
        </body></html>"#;

        let artwork = extractor().extract(html, &url("/product/size-study/")).unwrap();
        assert_eq!(artwork.title, "Size Study");
        assert_eq!(artwork.size.as_deref(), Some("50 x 60 cm (framed)"));
        assert_eq!(
            artwork.image_url.as_deref(),
            Some("https://cdn.example.com/images/size-study.jpg")
        );
    }

    #[test]
    fn test_relative_image_is_resolved() {
        let html = r#"<html><body><h1>Dune by Someone</h1>
            <img src="/media/dune.webp" alt="other" /></body></html>"#;
        let artwork = extractor().extract(html, &url("/product/dune/")).unwrap();
        assert_eq!(
            artwork.image_url.as_deref(),
            Some("https://www.artfinder.com/media/dune.webp")
        );
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let html = "<html><body><h1>No artist reference here</h1></body></html>";
        let result = extractor().extract(html, &url("/product/x/"));
        assert!(matches!(result, Err(ExtractError::MissingField("title"))));
    }

    #[test]
    fn test_non_item_url_fails_validation() {
        let html = "<html><body><h1>Dune by Someone</h1></body></html>";
        let result = extractor().extract(html, &url("/artist/someone/"));
        assert!(matches!(result, Err(ExtractError::Validation(_))));
    }

    #[test]
    fn test_strip_label() {
        assert_eq!(strip_label("Size: 30 x 40 cm", "size"), "30 x 40 cm");
        assert_eq!(strip_label("Size", "size"), "");
    }
}
