use ulid::Ulid;

use crate::model::VehicleId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    NotFound(VehicleId),
    /// The requested period overlaps `reservation_id` on the same vehicle.
    Conflict {
        vehicle_id: VehicleId,
        reservation_id: Ulid,
    },
    InvalidPrice(f64),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "vehicle not found: {id}"),
            EngineError::Conflict {
                vehicle_id,
                reservation_id,
            } => write!(
                f,
                "vehicle {vehicle_id} already reserved for the selected period (reservation {reservation_id})"
            ),
            EngineError::InvalidPrice(p) => {
                write!(f, "invalid price per day: {p} (must be finite and non-negative)")
            }
        }
    }
}

impl std::error::Error for EngineError {}
