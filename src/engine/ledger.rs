use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::conflict::check_no_conflict;
use super::EngineError;

pub type SharedLedger = Arc<RwLock<VehicleLedger>>;

/// Reservations indexed by vehicle id. Ids are not checked against the catalog.
/// Every vehicle has its own lock, so reservations on different vehicles never contend.
#[derive(Default)]
pub struct Ledger {
    by_vehicle: DashMap<VehicleId, SharedLedger>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vehicle_id: &VehicleId) -> Option<SharedLedger> {
        self.by_vehicle.get(vehicle_id).map(|e| e.value().clone())
    }

    fn get_or_create(&self, vehicle_id: &VehicleId) -> SharedLedger {
        self.by_vehicle
            .entry(vehicle_id.clone())
            .or_default()
            .value()
            .clone()
    }

    pub async fn overlaps(&self, vehicle_id: &VehicleId, period: &Period) -> bool {
        let Some(shared) = self.get(vehicle_id) else {
            return false;
        };
        let guard = shared.read().await;
        guard.overlapping(period).next().is_some()
    }

    /// Check and insert under one write lock.
    pub async fn reserve(
        &self,
        vehicle_id: VehicleId,
        period: Period,
    ) -> Result<Reservation, EngineError> {
        loop {
            let shared = self.get_or_create(&vehicle_id);
            let mut guard = shared.write().await;
            if guard.retired {
                // Lost a race with purge(); the retired ledger is already out of the index.
                continue;
            }
            check_no_conflict(&vehicle_id, &guard, &period)?;
            let reservation = Reservation {
                id: Ulid::new(),
                vehicle_id,
                period,
            };
            guard.insert(reservation.clone());
            return Ok(reservation);
        }
    }

    pub async fn reservations(&self, vehicle_id: &VehicleId) -> Vec<Reservation> {
        match self.get(vehicle_id) {
            Some(shared) => shared.read().await.reservations.clone(),
            None => Vec::new(),
        }
    }

    /// Drop every reservation of `vehicle_id`. Returns how many were dropped.
    pub async fn purge(&self, vehicle_id: &VehicleId) -> usize {
        let Some(shared) = self.get(vehicle_id) else {
            return 0;
        };
        let mut guard = shared.write().await;
        if guard.retired {
            return 0;
        }
        guard.retired = true;
        let dropped = guard.reservations.len();
        guard.reservations.clear();
        self.by_vehicle
            .remove_if(vehicle_id, |_, current| Arc::ptr_eq(current, &shared));
        dropped
    }
}
