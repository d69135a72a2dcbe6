//! Failure kinds surfaced by book operations.

use thiserror::Error;

use crate::order::OrderId;

/// Why a book operation was refused.
///
/// Internal invariant violations are not represented here: they are
/// assertion failures and abort the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order quantity must be strictly positive.
    #[error("order quantity must be positive")]
    ZeroQuantity,

    /// A limit price could not be represented (non-finite input).
    #[error("price is not representable")]
    MalformedPrice,

    /// Cancel/modify/find referenced an id with no live order.
    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    /// An order with this id is already resident in the book.
    #[error("order {0} already resident")]
    DuplicateOrder(OrderId),

    /// The fixed-capacity slot arena has no free slot.
    #[error("order storage exhausted")]
    StorageExhausted,
}
