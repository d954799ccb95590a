use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurum_core::{CategoryId, DomainError, DomainResult, Entity};

use crate::product::ensure_slug;

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &CategoryId {
        &self.id
    }
}

/// Validated input for category creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        ensure_slug(&self.slug)
    }

    pub fn into_category(self, id: CategoryId, now: DateTime<Utc>) -> DomainResult<Category> {
        self.validate()?;
        Ok(Category {
            id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            created_at: now,
        })
    }
}

/// Partial category update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl CategoryPatch {
    pub fn apply_to(&self, category: &mut Category) -> DomainResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            category.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            ensure_slug(slug)?;
            category.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            category.description = Some(description.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_category_from_valid_input() {
        let cat = NewCategory {
            name: "Necklaces".to_string(),
            slug: "necklaces".to_string(),
            description: None,
        }
        .into_category(CategoryId::new(), Utc::now())
        .unwrap();
        assert_eq!(cat.slug, "necklaces");
    }

    #[test]
    fn rejects_invalid_slug() {
        let err = NewCategory {
            name: "Necklaces".to_string(),
            slug: "Necklaces!".to_string(),
            description: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
