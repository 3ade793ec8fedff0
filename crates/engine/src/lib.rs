//! Transactional stock-mutation core.
//!
//! The [`Engine`] records typed stock movements (`IN`, `OUT`, `TRANSFER`)
//! against product quality bins and keeps every bin's on-hand quantity equal
//! to the signed sum of the movements that touch it. Each write runs in a
//! single database transaction; concurrent writes on the same bin serialize
//! on the bin row.

pub use code::{CODE_LEN, is_valid_code};
pub use commands::{
    CreateMovementCmd, NewBinCmd, NewPartyCmd, NewProductCmd, TransferStockCmd, UpdateMovementCmd,
};
pub use context::OpContext;
pub use customers::Customer;
pub use error::{EngineError, FieldError, ValidationErrors};
pub use ops::{Engine, EngineBuilder};
pub use page::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, Page, PageRequest};
pub use product_qualities::{Adjustment, Bin, BinWithProduct};
pub use products::Product;
pub use suppliers::Supplier;
pub use transactions::{Movement, MovementDetail, MovementKind};
pub use unit::{UnitOfMass, convert};
pub use users::User;

mod code;
mod commands;
mod context;
mod error;
mod ops;
mod page;
mod store;
mod unit;
mod util;

mod customers;
mod product_qualities;
mod products;
mod suppliers;
mod transactions;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
