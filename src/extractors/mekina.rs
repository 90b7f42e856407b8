use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

use super::{Extractor, text_of, url_attr};
use crate::models::Listing;

static CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".relative .m-1 a").expect("static selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".text-sm").expect("static selector"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".flex.flex-col.justify-between.bg-primary-main").expect("static selector")
});
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("static selector"));

/// Mekina.net search results: each card is an anchor inside `.relative .m-1`.
///
/// The site does not show a location on its cards, so `location` stays empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct MekinaExtractor;

impl MekinaExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for MekinaExtractor {
    fn name(&self) -> &'static str {
        "mekina"
    }

    fn card_selector(&self) -> &Selector {
        &CARD
    }

    fn extract(&self, card: ElementRef<'_>, base: &Url) -> Listing {
        let image = card
            .select(&IMAGE)
            .next()
            .map(|img| url_attr(img, &["src", "data-src"], base))
            .unwrap_or_default();

        Listing {
            title: text_of(card, &TITLE),
            price: text_of(card, &PRICE),
            link: url_attr(card, &["href"], base),
            location: String::new(),
            image,
        }
    }
}
