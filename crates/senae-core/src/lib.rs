//! SENAE import tariff engine for courier categories B, C and D.
//!
//! The engine is a pure function of a [`TariffInput`] and the active
//! [`RegulatoryRates`]. Web and CLI front ends call into it; nothing here
//! performs I/O.

mod batch;
mod engine;
mod error;
mod input;
mod rates;
mod suggest;

pub use batch::{
    BatchError, BatchResult, BatchSummary, LineItem, LineItemResult, DEFAULT_UNIT_WEIGHT_KG,
};
pub use engine::{calculate, round_for_display, Charges, TariffEngine, TariffResult, TaxShares};
pub use error::{InputField, LimitedField, TariffError};
pub use input::{Category, ProductType, TariffInput, TariffRequest};
pub use rates::*;

pub const CRATE_NAME: &str = "senae-core";
