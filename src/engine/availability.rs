use crate::model::*;

use super::Engine;

impl Engine {
    /// Vehicles with no reservation overlapping `period`.
    ///
    /// A plain read: nothing is held between this call and a later
    /// `reserve_vehicle`, which re-checks under the vehicle's write lock.
    pub async fn list_available_vehicles(&self, period: Period) -> Vec<Vehicle> {
        let vehicles = self.catalog.list();
        self.free_of(vehicles, &period).await
    }

    pub(super) async fn free_of(&self, vehicles: Vec<Vehicle>, period: &Period) -> Vec<Vehicle> {
        let mut free = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            if !self.ledger.overlaps(&vehicle.id, period).await {
                free.push(vehicle);
            }
        }
        free
    }
}
