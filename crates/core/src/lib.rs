pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod repository;

pub use catalog::ProductCatalogService;
pub use domain::product::{
    CreateProduct, PatchProduct, Product, ProductId, ProductStatus, UpdateProduct,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use repository::{Outcome, Record, Repository, RepositoryError};
