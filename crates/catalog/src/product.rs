use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aurum_core::{CategoryId, DomainError, DomainResult, Entity, ProductId};

/// Products flag themselves as low-stock at or below this count unless an
/// explicit threshold is set.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Catalog product.
///
/// `stock` is a materialized projection of the inventory ledger; it is only
/// ever mutated through the inventory layer, never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub stock: i64,
    pub low_stock_threshold: i64,
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub material: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}

impl Product {
    /// Boundary is inclusive: `stock == low_stock_threshold` is low.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

/// Validated input for product creation.
///
/// Carries no `stock` on purpose: new products start at zero and receive
/// stock through recorded inventory movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub low_stock_threshold: i64,
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub material: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            description: None,
            short_description: None,
            price,
            compare_price: None,
            sku: None,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            images: Vec::new(),
            category_id: None,
            material: None,
            weight: None,
            dimensions: None,
            is_active: true,
            is_featured: false,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        ensure_name(&self.name)?;
        ensure_slug(&self.slug)?;
        ensure_price(self.price)?;
        if let Some(compare) = self.compare_price {
            ensure_price(compare)?;
        }
        if self.low_stock_threshold < 0 {
            return Err(DomainError::validation(
                "low_stock_threshold cannot be negative",
            ));
        }
        Ok(())
    }

    /// Materialize a product row from validated input.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> DomainResult<Product> {
        self.validate()?;
        Ok(Product {
            id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            short_description: self.short_description,
            price: self.price,
            compare_price: self.compare_price,
            sku: self.sku,
            stock: 0,
            low_stock_threshold: self.low_stock_threshold,
            images: self.images,
            category_id: self.category_id,
            material: self.material,
            weight: self.weight,
            dimensions: self.dimensions,
            is_active: self.is_active,
            is_featured: self.is_featured,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial product update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub low_stock_threshold: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
    pub material: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl ProductPatch {
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &self.name {
            ensure_name(name)?;
            product.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            ensure_slug(slug)?;
            product.slug = slug.clone();
        }
        if let Some(price) = self.price {
            ensure_price(price)?;
            product.price = price;
        }
        if let Some(compare) = self.compare_price {
            ensure_price(compare)?;
            product.compare_price = Some(compare);
        }
        if let Some(threshold) = self.low_stock_threshold {
            if threshold < 0 {
                return Err(DomainError::validation(
                    "low_stock_threshold cannot be negative",
                ));
            }
            product.low_stock_threshold = threshold;
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(short) = &self.short_description {
            product.short_description = Some(short.clone());
        }
        if let Some(sku) = &self.sku {
            product.sku = Some(sku.clone());
        }
        if let Some(images) = &self.images {
            product.images = images.clone();
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(material) = &self.material {
            product.material = Some(material.clone());
        }
        if let Some(weight) = self.weight {
            product.weight = Some(weight);
        }
        if let Some(dimensions) = &self.dimensions {
            product.dimensions = Some(dimensions.clone());
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(is_featured) = self.is_featured {
            product.is_featured = is_featured;
        }
        product.updated_at = now;
        Ok(())
    }
}

fn ensure_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

fn ensure_price(price: Decimal) -> DomainResult<()> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}

pub(crate) fn ensure_slug(slug: &str) -> DomainResult<()> {
    if slug.is_empty() {
        return Err(DomainError::validation("slug cannot be empty"));
    }
    let ok = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !ok {
        return Err(DomainError::validation(
            "slug must contain only lowercase letters, digits, and hyphens",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, threshold: i64) -> Product {
        let mut p = NewProduct::new("Gold Band", "gold-band", "129.00".parse().unwrap())
            .into_product(ProductId::new(), Utc::now())
            .unwrap();
        p.stock = stock;
        p.low_stock_threshold = threshold;
        p
    }

    #[test]
    fn new_products_start_with_zero_stock() {
        let p = NewProduct::new("Silver Chain", "silver-chain", "59.90".parse().unwrap())
            .into_product(ProductId::new(), Utc::now())
            .unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn stock_equal_to_threshold_is_low() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(0, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn rejects_blank_name() {
        let err = NewProduct::new("   ", "ok-slug", Decimal::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_bad_slug() {
        let err = NewProduct::new("Ring", "Not A Slug", Decimal::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_negative_price() {
        let err = NewProduct::new("Ring", "ring", "-1".parse().unwrap())
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn patch_applies_only_given_fields() {
        let mut p = product(3, 5);
        let before_slug = p.slug.clone();
        let patch = ProductPatch {
            price: Some("150.00".parse().unwrap()),
            is_featured: Some(true),
            ..Default::default()
        };
        patch.apply_to(&mut p, Utc::now()).unwrap();
        assert_eq!(p.price, "150.00".parse().unwrap());
        assert!(p.is_featured);
        assert_eq!(p.slug, before_slug);
        assert_eq!(p.stock, 3);
    }

    #[test]
    fn patch_rejects_invalid_values() {
        let mut p = product(3, 5);
        let patch = ProductPatch {
            low_stock_threshold: Some(-1),
            ..Default::default()
        };
        assert!(patch.apply_to(&mut p, Utc::now()).is_err());
    }
}
