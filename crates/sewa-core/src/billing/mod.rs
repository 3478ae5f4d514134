//! Billing: cart building, import of pending clinical requests, settlement.
//!
//! Settlement is the only path that moves financial sub-statuses forward and
//! the only path that deducts stock for a sale, and it runs as one database
//! transaction.

mod cart;
mod reconcile;

pub use cart::*;
pub use reconcile::*;

use thiserror::Error;

/// Billing errors.
#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Select a specific organization first")]
    AmbiguousOrganization,

    #[error("Quantity must be positive")]
    InvalidQuantity,

    #[error("'{0}' is out of stock")]
    OutOfStock(String),

    #[error("Insufficient stock for '{0}'")]
    InsufficientStock(String),

    #[error("Unknown inventory item: {0}")]
    UnknownItem(String),

    #[error("Visit record not found: {0}")]
    VisitNotFound(String),

    #[error("Visit {0} belongs to another organization")]
    OrgMismatch(String),

    #[error("'{0}' has already been billed")]
    AlreadyBilled(String),
}

pub type BillingResult<T> = Result<T, BillingError>;
