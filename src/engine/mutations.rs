use tracing::{debug, info};

use crate::model::*;

use super::conflict::validate_price;
use super::{Engine, EngineError};

impl Engine {
    pub fn add_vehicle(
        &self,
        model: String,
        size: VehicleSize,
        price_per_day: f64,
    ) -> Result<Vehicle, EngineError> {
        validate_price(price_per_day)?;
        let vehicle = self.catalog.insert(model, size, price_per_day);
        info!("added vehicle {} ({}, {})", vehicle.id, vehicle.model, vehicle.size);
        Ok(vehicle)
    }

    pub fn set_vehicle_price(
        &self,
        id: &VehicleId,
        price_per_day: f64,
    ) -> Result<Vehicle, EngineError> {
        validate_price(price_per_day)?;
        let vehicle = self.catalog.set_price(id, price_per_day)?;
        debug!("vehicle {id} price set to {price_per_day}");
        Ok(vehicle)
    }

    /// Remove a vehicle and every reservation held against it.
    pub async fn remove_vehicle(&self, id: &VehicleId) -> Result<(), EngineError> {
        // Catalog first: once the vehicle is gone no availability read can see it,
        // so purging afterwards never exposes a listed vehicle with missing reservations.
        self.catalog.remove(id)?;
        let dropped = self.ledger.purge(id).await;
        info!("removed vehicle {id}, dropped {dropped} reservations");
        Ok(())
    }

    /// Reserve `vehicle_id` for `period`. The id is not checked against the catalog.
    pub async fn reserve_vehicle(
        &self,
        vehicle_id: VehicleId,
        period: Period,
    ) -> Result<Reservation, EngineError> {
        match self.ledger.reserve(vehicle_id, period).await {
            Ok(reservation) => {
                info!(
                    "reserved vehicle {} from {} to {}",
                    reservation.vehicle_id, period.pickup_date, period.return_date
                );
                Ok(reservation)
            }
            Err(e) => {
                metrics::counter!(crate::observability::RESERVATION_CONFLICTS_TOTAL).increment(1);
                debug!("reservation rejected: {e}");
                Err(e)
            }
        }
    }
}
