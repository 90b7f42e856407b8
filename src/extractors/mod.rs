use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use url::Url;

use crate::models::Listing;

pub mod mekina;

pub use mekina::MekinaExtractor;

/// Maps one listing card of a source site to a [`Listing`].
///
/// Implementations are pure: they only look at the node they are given.
/// A missing sub-element becomes an empty field, never an error.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Selects every listing card on a search results page.
    fn card_selector(&self) -> &Selector;

    /// `base` is the page URL, used to absolutize relative links and images.
    fn extract(&self, card: ElementRef<'_>, base: &Url) -> Listing;
}

/// Runs `extractor` over every card of a full results page, in document order.
pub fn extract_all(extractor: &dyn Extractor, html: &str, base: &Url) -> Vec<Listing> {
    let document = Html::parse_document(html);
    document
        .select(extractor.card_selector())
        .map(|card| extractor.extract(card, base))
        .collect()
}

pub fn by_name(name: &str) -> Option<Arc<dyn Extractor>> {
    match name {
        "mekina" => Some(Arc::new(MekinaExtractor::new())),
        _ => None,
    }
}

pub fn is_known(name: &str) -> bool {
    by_name(name).is_some()
}

/// Whitespace-normalized text of the first match of `selector` under `node`.
pub(crate) fn text_of(node: ElementRef<'_>, selector: &Selector) -> String {
    node.select(selector)
        .next()
        .map(|el| normalize_text(el.text()))
        .unwrap_or_default()
}

pub(crate) fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Absolute form of a URL-valued attribute, or empty when it is missing.
pub(crate) fn url_attr(node: ElementRef<'_>, attrs: &[&str], base: &Url) -> String {
    attrs
        .iter()
        .filter_map(|attr| node.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(|value| match base.join(value) {
            Ok(url) => url.to_string(),
            Err(_) => value.to_string(),
        })
        .unwrap_or_default()
}
