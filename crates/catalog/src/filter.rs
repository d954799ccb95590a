//! Catalog query model: ANDed filters plus limit/offset pagination.

use serde::{Deserialize, Serialize};

use aurum_core::CategoryId;

use crate::product::Product;

/// Product listing filter. All set conditions must hold (ANDed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductFilter {
    /// Predicate shared by every backend; pagination is applied separately so
    /// the COUNT total reflects the same conditions.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id {
            if product.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(is_active) = self.is_active {
            if product.is_active != is_active {
                return false;
            }
        }
        if let Some(is_featured) = self.is_featured {
            if product.is_featured != is_featured {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = product.name.to_lowercase().contains(&needle);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

/// One page of products plus the unpaginated total for the same filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NewProduct;
    use aurum_core::ProductId;
    use chrono::Utc;

    fn product(name: &str, description: Option<&str>, featured: bool) -> Product {
        let mut new = NewProduct::new(
            name,
            "slug-under-test",
            "10.00".parse().unwrap(),
        );
        new.description = description.map(|d| d.to_string());
        new.is_featured = featured;
        new.into_product(ProductId::new(), Utc::now()).unwrap()
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_description() {
        let filter = ProductFilter {
            search: Some("SAPPHIRE".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&product("Sapphire Ring", None, false)));
        assert!(filter.matches(&product("Ring", Some("a blue sapphire"), false)));
        assert!(!filter.matches(&product("Ruby Ring", Some("deep red"), false)));
    }

    #[test]
    fn conditions_are_anded() {
        let filter = ProductFilter {
            search: Some("ring".to_string()),
            is_featured: Some(true),
            ..Default::default()
        };
        assert!(filter.matches(&product("Ring", None, true)));
        assert!(!filter.matches(&product("Ring", None, false)));
    }

    #[test]
    fn category_mismatch_excludes() {
        let filter = ProductFilter {
            category_id: Some(CategoryId::new()),
            ..Default::default()
        };
        assert!(!filter.matches(&product("Ring", None, false)));
    }
}
