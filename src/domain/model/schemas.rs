//! Category and product schemas.

use crate::domain::model::{EntitySchema, Relation};
use crate::storage::CollectionSpec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("Path `{}` is required.", field));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!(
            "Path `{}` ({}) must be a non-negative number.",
            field, value
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique across categories.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Name of the category this product belongs to. Not checked against existing categories.
    pub category: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price: f64,
    pub in_stock: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<u32>,
}

pub const CATEGORIES: CollectionSpec = CollectionSpec {
    name: "categories",
    unique: &["name"],
};

pub const PRODUCTS: CollectionSpec = CollectionSpec {
    name: "products",
    unique: &[],
};

const CATEGORY_RELATIONS: &[Relation] = &[Relation {
    field: "products",
    local_key: "name",
    foreign_collection: PRODUCTS.name,
    foreign_key: "category",
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct CategorySchema;

impl EntitySchema for CategorySchema {
    type Record = Category;
    type Patch = CategoryPatch;

    fn collection(&self) -> CollectionSpec {
        CATEGORIES
    }

    fn check_record(&self, record: &Category) -> Result<(), String> {
        required("name", &record.name)
    }

    fn check_patch(&self, patch: &CategoryPatch) -> Result<(), String> {
        match &patch.name {
            Some(name) => required("name", name),
            None => Ok(()),
        }
    }

    fn relations(&self) -> &'static [Relation] {
        CATEGORY_RELATIONS
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductSchema;

impl EntitySchema for ProductSchema {
    type Record = Product;
    type Patch = ProductPatch;

    fn collection(&self) -> CollectionSpec {
        PRODUCTS
    }

    fn check_record(&self, record: &Product) -> Result<(), String> {
        required("category", &record.category)?;
        required("name", &record.name)?;
        non_negative("price", record.price)
    }

    fn check_patch(&self, patch: &ProductPatch) -> Result<(), String> {
        if let Some(category) = &patch.category {
            required("category", category)?;
        }
        if let Some(name) = &patch.name {
            required("name", name)?;
        }
        if let Some(price) = patch.price {
            non_negative("price", price)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_requires_a_non_blank_name() {
        assert!(serde_json::from_value::<Category>(json!({})).is_err());
        let blank: Category = serde_json::from_value(json!({"name": "  "})).unwrap();
        assert!(CategorySchema.check_record(&blank).is_err());
        let ok: Category = serde_json::from_value(json!({"name": "tools"})).unwrap();
        assert!(CategorySchema.check_record(&ok).is_ok());
    }

    #[test]
    fn category_uses_camel_case_and_drops_unknown_fields() {
        let c: Category = serde_json::from_value(json!({
            "name": "tools",
            "displayName": "Tools",
            "color": "red"
        }))
        .unwrap();
        assert_eq!(c.display_name.as_deref(), Some("Tools"));
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({"name": "tools", "displayName": "Tools"})
        );
    }

    #[test]
    fn product_price_and_stock_must_be_non_negative() {
        let base = json!({"category": "tools", "name": "saw", "price": 3.5, "inStock": 2});
        let p: Product = serde_json::from_value(base).unwrap();
        assert!(ProductSchema.check_record(&p).is_ok());

        let p: Product = serde_json::from_value(
            json!({"category": "tools", "name": "saw", "price": -1.0, "inStock": 2}),
        )
        .unwrap();
        assert!(ProductSchema.check_record(&p).is_err());

        assert!(serde_json::from_value::<Product>(
            json!({"category": "tools", "name": "saw", "price": 1.0, "inStock": -2})
        )
        .is_err());
        assert!(serde_json::from_value::<Product>(
            json!({"category": "tools", "name": "saw", "price": 1.0, "inStock": 1.5})
        )
        .is_err());
    }

    #[test]
    fn product_requires_price_and_stock() {
        assert!(serde_json::from_value::<Product>(json!({"category": "tools", "name": "saw"})).is_err());
    }

    #[test]
    fn patches_only_serialize_present_fields() {
        let patch: ProductPatch = serde_json::from_value(json!({"price": 9.0, "inStock": null})).unwrap();
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"price": 9.0}));
        assert!(ProductSchema.check_patch(&patch).is_ok());

        let bad: CategoryPatch = serde_json::from_value(json!({"name": ""})).unwrap();
        assert!(CategorySchema.check_patch(&bad).is_err());
    }

    #[test]
    fn categories_expose_their_products() {
        let rel = CategorySchema.relations();
        assert_eq!(rel.len(), 1);
        assert_eq!(rel[0].field, "products");
        assert_eq!(rel[0].foreign_collection, "products");
        assert!(ProductSchema.relations().is_empty());
    }
}
