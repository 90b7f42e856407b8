use serde::{Deserialize, Serialize};

/// One normalized vehicle advertisement.
///
/// Every field is always present in the JSON form, empty when the source
/// markup did not carry it. The browser UI depends on these names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Listing {
    #[serde(default)]
    pub title: String,
    /// Source-native price text, e.g. `"ETB 1,250,000"`.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image: String,
}

impl Listing {
    pub fn new(
        title: impl Into<String>,
        price: impl Into<String>,
        link: impl Into<String>,
        location: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
            link: link.into(),
            location: location.into(),
            image: image.into(),
        }
    }

    /// Returns a copy carrying `location` when this listing has none.
    pub fn with_default_location(&self, location: &str) -> Self {
        if !self.location.trim().is_empty() || location.is_empty() {
            return self.clone();
        }
        Self {
            location: location.to_string(),
            ..self.clone()
        }
    }

    pub fn has_link(&self) -> bool {
        !self.link.trim().is_empty()
    }

    /// Numeric reading of the price text, see [`crate::filter::parse_price`].
    pub fn price_value(&self) -> Option<f64> {
        crate::filter::parse_price(&self.price)
    }
}
