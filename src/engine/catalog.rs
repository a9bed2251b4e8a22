use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::*;

use super::EngineError;

struct CatalogEntry {
    /// Insertion sequence; listing order.
    seq: u64,
    vehicle: Vehicle,
}

/// Vehicle records keyed by id. Each mutation is a single shard-locked map operation,
/// so readers only ever copy out whole records.
pub struct Catalog {
    vehicles: DashMap<VehicleId, CatalogEntry>,
    next_seq: AtomicU64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            vehicles: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn insert(&self, model: String, size: VehicleSize, price_per_day: f64) -> Vehicle {
        loop {
            let id = VehicleId::generate();
            // Vacant-only insert: a duplicate id draws again instead of overwriting.
            if let Entry::Vacant(slot) = self.vehicles.entry(id.clone()) {
                let vehicle = Vehicle {
                    id,
                    model,
                    size,
                    price_per_day,
                };
                slot.insert(CatalogEntry {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    vehicle: vehicle.clone(),
                });
                return vehicle;
            }
        }
    }

    pub fn get(&self, id: &VehicleId) -> Option<Vehicle> {
        self.vehicles.get(id).map(|e| e.vehicle.clone())
    }

    /// All vehicles matching `pred`, in insertion order.
    pub fn collect_where(&self, pred: impl Fn(&Vehicle) -> bool) -> Vec<Vehicle> {
        let mut hits: Vec<(u64, Vehicle)> = self
            .vehicles
            .iter()
            .filter(|e| pred(&e.vehicle))
            .map(|e| (e.seq, e.vehicle.clone()))
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        hits.into_iter().map(|(_, v)| v).collect()
    }

    pub fn list(&self) -> Vec<Vehicle> {
        self.collect_where(|_| true)
    }

    pub fn list_by_size(&self, size: VehicleSize) -> Vec<Vehicle> {
        self.collect_where(|v| v.size == size)
    }

    pub fn set_price(&self, id: &VehicleId, price_per_day: f64) -> Result<Vehicle, EngineError> {
        let mut entry = self
            .vehicles
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        entry.vehicle.price_per_day = price_per_day;
        Ok(entry.vehicle.clone())
    }

    pub fn remove(&self, id: &VehicleId) -> Result<Vehicle, EngineError> {
        self.vehicles
            .remove(id)
            .map(|(_, e)| e.vehicle)
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }
}
