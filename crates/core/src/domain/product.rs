use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::repository::Record;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Inactive,
    OutOfStock,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    pub stock_quantity: u32,
    pub images: Vec<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub weight: Option<Decimal>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Product {
    fn id(&self) -> &str {
        &self.id.0
    }
}

/// Input for creating a product. `weight` and `status` are optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    pub stock_quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

/// Input for a full replacement. Every field except `weight` must be supplied.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    pub stock_quantity: u32,
    pub images: Vec<String>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub weight: Option<Decimal>,
    pub status: ProductStatus,
}

/// Input for a partial update. Absent fields keep their stored value.
///
/// `weight` distinguishes "not supplied" (`None`) from "clear it" (`Some(None)`).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchProduct {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_present_weight")]
    pub weight: Option<Option<Decimal>>,
    pub status: Option<ProductStatus>,
}

fn deserialize_present_weight<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    rust_decimal::serde::arbitrary_precision_option::deserialize(deserializer).map(Some)
}

impl CreateProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_amounts(Some(self.price), self.weight)
    }
}

impl UpdateProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_amounts(Some(self.price), self.weight)
    }
}

impl PatchProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_amounts(self.price, self.weight.flatten())
    }
}

fn validate_amounts(price: Option<Decimal>, weight: Option<Decimal>) -> Result<(), DomainError> {
    if price.is_some_and(|price| price < Decimal::ZERO) {
        return Err(DomainError::NegativePrice);
    }
    if weight.is_some_and(|weight| weight < Decimal::ZERO) {
        return Err(DomainError::NegativeWeight);
    }
    Ok(())
}

impl Product {
    /// Builds a new product from creation input. `status` defaults to `Active`.
    pub fn new(id: ProductId, input: CreateProduct, now: DateTime<Utc>) -> Self {
        let mut product = Self {
            id,
            sku: input.sku,
            name: input.name,
            description: input.description,
            category: input.category,
            brand: input.brand,
            price: input.price,
            stock_quantity: input.stock_quantity,
            images: input.images,
            weight: input.weight,
            status: input.status.unwrap_or(ProductStatus::Active),
            created_at: now,
            updated_at: now,
        };
        product.reconcile_status(false);
        product
    }

    /// Full replacement keeping `id` and `created_at`.
    pub fn replaced_with(&self, input: UpdateProduct, now: DateTime<Utc>) -> Self {
        let mut product = Self {
            id: self.id.clone(),
            sku: input.sku,
            name: input.name,
            description: input.description,
            category: input.category,
            brand: input.brand,
            price: input.price,
            stock_quantity: input.stock_quantity,
            images: input.images,
            weight: input.weight,
            status: input.status,
            created_at: self.created_at,
            updated_at: now,
        };
        product.reconcile_status(true);
        product
    }

    /// Merges the supplied fields of `patch` over this product.
    pub fn apply_patch(&mut self, patch: PatchProduct, now: DateTime<Utc>) {
        if let Some(sku) = patch.sku {
            self.sku = sku;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(brand) = patch.brand {
            self.brand = brand;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock_quantity) = patch.stock_quantity {
            self.stock_quantity = stock_quantity;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }

        self.reconcile_status(false);
        self.updated_at = now;
    }

    pub fn deduct_stock(&mut self, quantity: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        let requested = positive_quantity(quantity)?;
        if requested > self.stock_quantity {
            return Err(DomainError::InsufficientStock {
                product_id: self.id.0.clone(),
                requested: quantity,
                available: self.stock_quantity,
            });
        }

        self.stock_quantity -= requested;
        self.reconcile_status(false);
        self.updated_at = now;
        Ok(())
    }

    pub fn restore_stock(&mut self, quantity: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        let restored = positive_quantity(quantity)?;
        self.stock_quantity = self
            .stock_quantity
            .checked_add(restored)
            .ok_or_else(|| DomainError::StockOverflow { product_id: self.id.0.clone() })?;

        self.reconcile_status(false);
        self.updated_at = now;
        Ok(())
    }

    /// Re-derives `status` from `stock_quantity`.
    ///
    /// Zero stock is always `OutOfStock`. Positive stock leaves `OutOfStock` for
    /// `Active` unless `status_explicit` is set, which only a full update does.
    pub fn reconcile_status(&mut self, status_explicit: bool) {
        if self.stock_quantity == 0 {
            self.status = ProductStatus::OutOfStock;
        } else if self.status == ProductStatus::OutOfStock && !status_explicit {
            self.status = ProductStatus::Active;
        }
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, DomainError> {
    if quantity <= 0 {
        return Err(DomainError::NonPositiveQuantity { quantity });
    }
    // Anything beyond u32::MAX can never be satisfied or stored.
    Ok(u32::try_from(quantity).unwrap_or(u32::MAX))
}
