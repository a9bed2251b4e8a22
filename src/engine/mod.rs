mod availability;
mod catalog;
mod conflict;
mod error;
mod ledger;
mod mutations;
mod queries;

pub use catalog::Catalog;
pub use error::EngineError;
pub use ledger::{Ledger, SharedLedger};

use crate::model::*;

/// Optional criteria for `Engine::filter_vehicles`, combined with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleFilter {
    pub size: Option<VehicleSize>,
    pub period: Option<Period>,
}

/// Fleet inventory plus reservation ledger. Cheap to share behind an `Arc`;
/// all methods take `&self`.
#[derive(Default)]
pub struct Engine {
    pub(super) catalog: Catalog,
    pub(super) ledger: Ledger,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle_count(&self) -> usize {
        self.catalog.len()
    }
}
