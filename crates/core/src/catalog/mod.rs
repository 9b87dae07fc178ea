//! Product catalog business rules on top of a [`Repository`].
//!
//! Every mutation runs inside [`Repository::modify`], so the read, check and
//! write steps of one operation (SKU uniqueness, stock arithmetic) hold the
//! store's own write gate. Any number of services may share one repository.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::product::{CreateProduct, PatchProduct, Product, ProductId, UpdateProduct};
use crate::errors::{ApplicationError, DomainError};
use crate::repository::{Outcome, Record, Repository, RepositoryError};

const ENTITY: &str = "product";

type Mutation<O> = Result<Outcome<O>, ApplicationError>;

pub struct ProductCatalogService<R> {
    repository: Arc<R>,
}

impl<R> ProductCatalogService<R>
where
    R: Repository<Product>,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn find_all(&self) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn find_one(&self, id: &str) -> Result<Product, ApplicationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(ENTITY, id))
    }

    pub async fn create(&self, input: CreateProduct) -> Result<Product, ApplicationError> {
        input.validate()?;
        let product = Product::new(ProductId::generate(), input, Utc::now());

        let created = self
            .repository
            .modify(move |products: &mut Vec<Product>| -> Mutation<Product> {
                ensure_sku_available(products, &product.sku, None)?;
                if products.iter().any(|existing| existing.id() == product.id()) {
                    return Err(RepositoryError::DuplicateId(product.id.0.clone()).into());
                }
                products.push(product.clone());
                Ok(Outcome::Changed(product))
            })
            .await?;
        info!(
            event_name = "catalog.product.created",
            product_id = %created.id.0,
            sku = %created.sku,
            stock_quantity = created.stock_quantity,
            status = created.status.as_str(),
            "product created"
        );
        Ok(created)
    }

    /// Full replacement: every field except `id` and `created_at` comes from `input`.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateProduct,
    ) -> Result<Product, ApplicationError> {
        input.validate()?;

        let updated = self
            .repository
            .modify(move |products: &mut Vec<Product>| -> Mutation<Product> {
                let index = position(products, id)?;
                if input.sku != products[index].sku {
                    ensure_sku_available(products, &input.sku, Some(id))?;
                }
                let replacement = products[index].replaced_with(input, Utc::now());
                products[index] = replacement.clone();
                Ok(Outcome::Changed(replacement))
            })
            .await?;
        info!(
            event_name = "catalog.product.updated",
            product_id = %updated.id.0,
            sku = %updated.sku,
            "product replaced"
        );
        Ok(updated)
    }

    pub async fn patch(&self, id: &str, input: PatchProduct) -> Result<Product, ApplicationError> {
        input.validate()?;

        let patched = self
            .repository
            .modify(move |products: &mut Vec<Product>| -> Mutation<Product> {
                let index = position(products, id)?;
                if let Some(sku) = input.sku.as_deref() {
                    if sku != products[index].sku {
                        ensure_sku_available(products, sku, Some(id))?;
                    }
                }
                let product = &mut products[index];
                product.apply_patch(input, Utc::now());
                Ok(Outcome::Changed(product.clone()))
            })
            .await?;
        info!(
            event_name = "catalog.product.patched",
            product_id = %patched.id.0,
            sku = %patched.sku,
            "product patched"
        );
        Ok(patched)
    }

    pub async fn remove(&self, id: &str) -> Result<Product, ApplicationError> {
        let removed = self
            .repository
            .modify(move |products: &mut Vec<Product>| -> Mutation<Product> {
                let index = position(products, id)?;
                Ok(Outcome::Changed(products.remove(index)))
            })
            .await?;
        info!(
            event_name = "catalog.product.removed",
            product_id = %removed.id.0,
            sku = %removed.sku,
            "product removed"
        );
        Ok(removed)
    }

    /// Takes `quantity` units out of stock, e.g. when an order is placed.
    pub async fn deduct_stock(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> Result<Product, ApplicationError> {
        let updated = self
            .repository
            .modify(move |products: &mut Vec<Product>| -> Mutation<Product> {
                let index = position(products, product_id)?;
                let product = &mut products[index];
                if let Err(error) = product.deduct_stock(quantity, Utc::now()) {
                    warn!(
                        event_name = "catalog.stock.deduct_rejected",
                        product_id,
                        quantity,
                        available = product.stock_quantity,
                        error = %error,
                        "stock deduction rejected"
                    );
                    return Err(error.into());
                }
                Ok(Outcome::Changed(product.clone()))
            })
            .await?;
        info!(
            event_name = "catalog.stock.deducted",
            product_id,
            quantity,
            stock_quantity = updated.stock_quantity,
            status = updated.status.as_str(),
            "stock deducted"
        );
        Ok(updated)
    }

    /// Puts `quantity` units back into stock, e.g. when an order is cancelled.
    pub async fn restore_stock(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> Result<Product, ApplicationError> {
        let updated = self
            .repository
            .modify(move |products: &mut Vec<Product>| -> Mutation<Product> {
                let index = position(products, product_id)?;
                let product = &mut products[index];
                if let Err(error) = product.restore_stock(quantity, Utc::now()) {
                    warn!(
                        event_name = "catalog.stock.restore_rejected",
                        product_id,
                        quantity,
                        error = %error,
                        "stock restoration rejected"
                    );
                    return Err(error.into());
                }
                Ok(Outcome::Changed(product.clone()))
            })
            .await?;
        info!(
            event_name = "catalog.stock.restored",
            product_id,
            quantity,
            stock_quantity = updated.stock_quantity,
            status = updated.status.as_str(),
            "stock restored"
        );
        Ok(updated)
    }
}

fn position(products: &[Product], id: &str) -> Result<usize, ApplicationError> {
    products
        .iter()
        .position(|product| product.id() == id)
        .ok_or_else(|| ApplicationError::not_found(ENTITY, id))
}

/// Fails when any product other than `exclude_id` already carries `sku`.
fn ensure_sku_available(
    products: &[Product],
    sku: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApplicationError> {
    let taken = products
        .iter()
        .any(|product| product.sku == sku && Some(product.id.0.as_str()) != exclude_id);
    if taken {
        warn!(event_name = "catalog.product.duplicate_sku", sku, "SKU already exists");
        return Err(DomainError::DuplicateSku { sku: sku.to_string() }.into());
    }
    Ok(())
}

impl<R> std::fmt::Debug for ProductCatalogService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCatalogService").finish_non_exhaustive()
    }
}
