use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Listing;

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]+").expect("static regex"));

// Leading number of the cleaned text, the way a lenient float reader would see it.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").expect("static regex"));

/// Reads a number out of free-form price text.
///
/// Everything except digits, `.` and `-` is dropped first, so
/// `"ETB 1,250,000"` reads as `1250000.0`. The longest numeric prefix of
/// what remains is used; `None` when there is none (`"Negotiable"`).
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(text, "");
    let number = LEADING_NUMBER.find(&cleaned)?;
    number.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Client-side predicates over an already fetched result set.
///
/// All criteria are optional and combine with AND. Blank strings count as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Case-sensitive substring of the title.
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Case-insensitive substring of the location.
    pub location: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.brand().is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.location().is_none()
    }

    fn brand(&self) -> Option<&str> {
        self.brand.as_deref().filter(|b| !b.is_empty())
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.trim().is_empty())
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(brand) = self.brand() {
            if !listing.title.contains(brand) {
                return false;
            }
        }

        if self.min_price.is_some() || self.max_price.is_some() {
            // an unreadable price never satisfies an active bound
            let Some(price) = listing.price_value() else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }

        if let Some(location) = self.location() {
            if !listing
                .location
                .to_lowercase()
                .contains(&location.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

/// Returns the listings satisfying every supplied criterion, in input order.
pub fn apply(listings: &[Listing], criteria: &FilterCriteria) -> Vec<Listing> {
    if criteria.is_empty() {
        return listings.to_vec();
    }
    listings
        .iter()
        .filter(|listing| criteria.matches(listing))
        .cloned()
        .collect()
}
