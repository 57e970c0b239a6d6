use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::{require_id, ValidationError};

/// A purchasable reading item.
///
/// Pages are stored in reading order. `reading_progress` is how far the reader
/// has got as a percentage, from 0 (not started) to 100 (finished).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub price: f64,
    pub is_purchased: bool,
    pub reading_progress: f64,
    pub category: BookCategory,
    pub pages: Vec<BookPage>,
}

/// A single page of a [`Book`]. Owned by exactly one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub id: String,
    pub content: String,
    pub page_number: u32,
}

/// The shelf a book is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookCategory {
    Manifestation,
    Spirituality,
    Success,
    Mindfulness,
}

impl BookCategory {
    pub const ALL: [Self; 4] = [
        Self::Manifestation,
        Self::Spirituality,
        Self::Success,
        Self::Mindfulness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifestation => "manifestation",
            Self::Spirituality => "spirituality",
            Self::Success => "success",
            Self::Mindfulness => "mindfulness",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manifestation" => Some(Self::Manifestation),
            "spirituality" => Some(Self::Spirituality),
            "success" => Some(Self::Success),
            "mindfulness" => Some(Self::Mindfulness),
            _ => None,
        }
    }
}

impl Book {
    /// Checks that page numbers rise with page position and that the numeric
    /// fields hold sensible amounts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("book", &self.id)?;

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidPrice(self.price));
        }
        if !(0.0..=100.0).contains(&self.reading_progress) {
            return Err(ValidationError::ProgressOutOfRange(self.reading_progress));
        }

        for (position, pair) in self.pages.windows(2).enumerate() {
            if pair[1].page_number <= pair[0].page_number {
                return Err(ValidationError::PageOutOfOrder {
                    position: position + 1,
                    page_number: pair[1].page_number,
                    previous: pair[0].page_number,
                });
            }
        }

        Ok(())
    }

    /// The page carrying `page_number`, if the book has one.
    pub fn page(&self, page_number: u32) -> Option<&BookPage> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(pages: &[u32]) -> Book {
        Book {
            id: "book-1".to_string(),
            title: "The Quiet Garden".to_string(),
            author: "Mara Ellis".to_string(),
            description: "Small daily practices".to_string(),
            cover_url: "https://cdn.example.com/covers/quiet-garden.png".to_string(),
            price: 4.99,
            is_purchased: false,
            reading_progress: 0.0,
            category: BookCategory::Mindfulness,
            pages: pages
                .iter()
                .map(|n| BookPage {
                    id: format!("page-{n}"),
                    content: format!("Page {n}"),
                    page_number: *n,
                })
                .collect(),
        }
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(book(&[1])).unwrap();

        assert_eq!(json["coverUrl"], "https://cdn.example.com/covers/quiet-garden.png");
        assert_eq!(json["isPurchased"], false);
        assert_eq!(json["readingProgress"], 0.0);
        assert_eq!(json["category"], "mindfulness");
        assert_eq!(json["pages"][0]["pageNumber"], 1);
    }

    #[test]
    fn json_round_trip_preserves_page_order() {
        let original = book(&[1, 2, 5]);
        let text = serde_json::to_string(&original).unwrap();
        let decoded: Book = serde_json::from_str(&text).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_unknown_category() {
        let mut json = serde_json::to_value(book(&[])).unwrap();
        json["category"] = "cooking".into();

        assert!(serde_json::from_value::<Book>(json).is_err());
    }

    #[test]
    fn category_literals_match_serde() {
        for category in BookCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, category.as_str());
            assert_eq!(BookCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(BookCategory::from_str("Success"), None);
    }

    #[test]
    fn validate_accepts_increasing_pages() {
        assert!(book(&[1, 2, 3]).validate().is_ok());
        assert!(book(&[]).validate().is_ok());
    }

    #[test]
    fn validate_rejects_pages_out_of_order() {
        let err = book(&[1, 3, 2]).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::PageOutOfOrder {
                position: 2,
                page_number: 2,
                previous: 3,
            }
        );
    }

    #[test]
    fn validate_rejects_duplicate_page_numbers() {
        assert!(book(&[1, 1]).validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_price_and_wild_progress() {
        let mut b = book(&[1]);
        b.price = -1.0;
        assert_eq!(b.validate(), Err(ValidationError::InvalidPrice(-1.0)));

        let mut b = book(&[1]);
        b.reading_progress = 140.0;
        assert_eq!(b.validate(), Err(ValidationError::ProgressOutOfRange(140.0)));
    }

    #[test]
    fn progress_is_a_percentage() {
        for progress in [0.0, 37.5, 100.0] {
            let mut b = book(&[1]);
            b.reading_progress = progress;
            assert!(b.validate().is_ok(), "{progress} should be accepted");
        }
        for progress in [-0.5, 100.5, f64::NAN] {
            let mut b = book(&[1]);
            b.reading_progress = progress;
            assert!(
                matches!(b.validate(), Err(ValidationError::ProgressOutOfRange(_))),
                "{progress} should be rejected"
            );
        }
    }

    #[test]
    fn page_looks_up_by_number() {
        let b = book(&[1, 2, 5]);
        assert_eq!(b.page(5).map(|p| p.id.as_str()), Some("page-5"));
        assert!(b.page(3).is_none());
    }
}
