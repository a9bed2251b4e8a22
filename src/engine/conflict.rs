use crate::model::*;

use super::EngineError;

pub(crate) fn validate_price(price_per_day: f64) -> Result<(), EngineError> {
    if !price_per_day.is_finite() || price_per_day < 0.0 {
        return Err(EngineError::InvalidPrice(price_per_day));
    }
    Ok(())
}

/// Reject `period` if any reservation in `ledger` overlaps it.
/// Caller must hold the ledger's write lock for the result to stay valid.
pub(crate) fn check_no_conflict(
    vehicle_id: &VehicleId,
    ledger: &VehicleLedger,
    period: &Period,
) -> Result<(), EngineError> {
    match ledger.overlapping(period).next() {
        Some(existing) => Err(EngineError::Conflict {
            vehicle_id: vehicle_id.clone(),
            reservation_id: existing.id,
        }),
        None => Ok(()),
    }
}
