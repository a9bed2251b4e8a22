use crate::model::*;

use super::{Engine, VehicleFilter};

impl Engine {
    pub fn list_vehicles(&self) -> Vec<Vehicle> {
        self.catalog.list()
    }

    pub fn list_vehicles_by_size(&self, size: VehicleSize) -> Vec<Vehicle> {
        self.catalog.list_by_size(size)
    }

    pub fn get_vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
        self.catalog.get(id)
    }

    pub async fn filter_vehicles(&self, filter: VehicleFilter) -> Vec<Vehicle> {
        let candidates = match filter.size {
            Some(size) => self.catalog.list_by_size(size),
            None => self.catalog.list(),
        };
        match filter.period {
            Some(period) => self.free_of(candidates, &period).await,
            None => candidates,
        }
    }

    /// Reservations held against `vehicle_id`, ordered by pickup date.
    pub async fn get_reservations(&self, vehicle_id: &VehicleId) -> Vec<Reservation> {
        self.ledger.reservations(vehicle_id).await
    }
}
