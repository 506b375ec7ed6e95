//! Product knowledge lookup
//!
//! Static product table matched against free-text input. The first product
//! (in definition order) whose name appears case-insensitively as a
//! substring of the input wins. There is no relevance ranking, so a short
//! name contained in a longer one can shadow it if defined first.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Returned by [`ProductCatalog::describe`] when no product name matches
pub const PRODUCT_NOT_FOUND: &str =
    "I'm sorry, I couldn't find the product you're asking about. Can you provide more details?";

/// Competing product used for the one-line comparison
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Competitor {
    name: String,
    price: String,
    comparison: String,
}

impl Competitor {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        comparison: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            comparison: comparison.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn comparison(&self) -> &str {
        &self.comparison
    }
}

/// A catalog entry
///
/// Fields are private; entries come from [`ProductCatalog::builtin`] or from
/// `[[products]]` in config.toml and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Product {
    name: String,
    price: String,
    features: Vec<String>,
    link: String,
    competitor: Competitor,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        features: Vec<String>,
        link: impl Into<String>,
        competitor: Competitor,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            features,
            link: link.into(),
            competitor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn competitor(&self) -> &Competitor {
        &self.competitor
    }

    /// Markdown description shown to the user
    pub fn describe(&self) -> String {
        format!(
            "The **{}**:\n\
             - Price: {}\n\
             - Features: {}\n\
             For more details: [Link]({})\n\
             Competitor: {} at {}.\n\
             Comparison: {}",
            self.name,
            self.price,
            self.features.join(", "),
            self.link,
            self.competitor.name,
            self.competitor.price,
            self.competitor.comparison
        )
    }
}

/// Ordered, read-only product table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    /// Build a catalog from explicit entries
    ///
    /// # Errors
    /// Rejects empty names, names with leading or trailing whitespace, and
    /// names that collide case-insensitively.
    pub fn new(products: Vec<Product>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for product in &products {
            if product.name.trim().is_empty() {
                return Err(AppError::Config(
                    "product name cannot be empty".to_string(),
                ));
            }
            if product.name.trim() != product.name {
                return Err(AppError::Config(format!(
                    "product name '{}' must not have leading or trailing whitespace",
                    product.name
                )));
            }
            let key = product.name.to_lowercase();
            if !seen.insert(key) {
                return Err(AppError::Config(format!(
                    "duplicate product name '{}' (names are matched case-insensitively)",
                    product.name
                )));
            }
        }
        Ok(Self { products })
    }

    /// The built-in product table
    pub fn builtin() -> Self {
        Self {
            products: vec![Product::new(
                "Epson T3 SCARA Robot",
                "$8,000",
                vec![
                    "Compact design".to_string(),
                    "Easy integration".to_string(),
                    "High-speed assembly".to_string(),
                ],
                "https://catalog.fa.com.my/Industrial-Robots",
                Competitor::new(
                    "ABB IRB 910SC",
                    "$9,500",
                    "Epson T3 is more cost-effective and provides similar performance for standard tasks.",
                ),
            )],
        }
    }

    /// First product whose name occurs in `input`, ignoring case
    pub fn find(&self, input: &str) -> Option<&Product> {
        let haystack = input.to_lowercase();
        self.products
            .iter()
            .find(|p| haystack.contains(&p.name.to_lowercase()))
    }

    /// Formatted description of the matching product, or [`PRODUCT_NOT_FOUND`]
    pub fn describe(&self, input: &str) -> String {
        match self.find(input) {
            Some(product) => product.describe(),
            None => PRODUCT_NOT_FOUND.to_string(),
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
