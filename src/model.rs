use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque vehicle identifier. Generated ids are ULID strings, but any string is
/// accepted as a reservation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VehicleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleSize {
    Min,
    Mid,
    Large,
}

impl VehicleSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleSize::Min => "min",
            VehicleSize::Mid => "mid",
            VehicleSize::Large => "large",
        }
    }
}

impl fmt::Display for VehicleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "min" => Ok(VehicleSize::Min),
            "mid" => Ok(VehicleSize::Mid),
            "large" => Ok(VehicleSize::Large),
            other => Err(format!("unknown vehicle size: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub model: String,
    pub size: VehicleSize,
    pub price_per_day: f64,
}

/// Closed date interval `[pickup_date, return_date]`. Both days are occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub pickup_date: NaiveDate,
    pub return_date: NaiveDate,
}

impl Period {
    pub fn new(pickup_date: NaiveDate, return_date: NaiveDate) -> Self {
        Self { pickup_date, return_date }
    }

    /// Touching endpoints count: a return on the 22nd blocks a pickup on the 22nd.
    pub fn overlaps(&self, other: &Period) -> bool {
        self.pickup_date <= other.return_date && other.pickup_date <= self.return_date
    }

    pub fn days(&self) -> i64 {
        (self.return_date - self.pickup_date).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub vehicle_id: VehicleId,
    pub period: Period,
}

/// All reservations held against one vehicle id.
#[derive(Debug, Clone, Default)]
pub struct VehicleLedger {
    /// Sorted by `period.pickup_date`.
    pub reservations: Vec<Reservation>,
    /// Set once the owning vehicle is removed; a retired ledger is no longer in the index.
    pub retired: bool,
}

impl VehicleLedger {
    /// Insert reservation maintaining sort order by pickup date.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .partition_point(|r| r.period.pickup_date <= reservation.period.pickup_date);
        self.reservations.insert(pos, reservation);
    }

    /// Return only reservations whose period overlaps the query.
    /// Binary search skips everything picked up after `query.return_date`.
    pub fn overlapping(&self, query: &Period) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.period.pickup_date <= query.return_date);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.period.overlaps(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn period(a: &str, b: &str) -> Period {
        Period::new(date(a), date(b))
    }

    fn reservation(a: &str, b: &str) -> Reservation {
        Reservation {
            id: Ulid::new(),
            vehicle_id: VehicleId::from("X"),
            period: period(a, b),
        }
    }

    #[test]
    fn period_overlap_is_closed() {
        let booked = period("2024-02-20", "2024-02-22");
        assert!(booked.overlaps(&period("2024-02-22", "2024-02-25"))); // touching
        assert!(booked.overlaps(&period("2024-02-18", "2024-02-20"))); // touching on the left
        assert!(!booked.overlaps(&period("2024-02-23", "2024-02-25")));
        assert!(!booked.overlaps(&period("2024-02-10", "2024-02-19")));
    }

    #[test]
    fn period_overlap_symmetric() {
        let a = period("2024-02-20", "2024-02-22");
        let b = period("2024-02-21", "2024-03-01");
        assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn period_containment_overlaps() {
        let outer = period("2024-01-01", "2024-12-31");
        let inner = period("2024-06-01", "2024-06-01");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn period_days_counts_both_ends() {
        assert_eq!(period("2024-02-20", "2024-02-22").days(), 3);
        assert_eq!(period("2024-02-21", "2024-02-21").days(), 1);
    }

    #[test]
    fn ledger_keeps_pickup_order() {
        let mut ledger = VehicleLedger::default();
        ledger.insert(reservation("2024-03-10", "2024-03-12"));
        ledger.insert(reservation("2024-01-01", "2024-01-02"));
        ledger.insert(reservation("2024-02-01", "2024-02-05"));
        let starts: Vec<_> = ledger.reservations.iter().map(|r| r.period.pickup_date).collect();
        assert_eq!(starts, vec![date("2024-01-01"), date("2024-02-01"), date("2024-03-10")]);
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut ledger = VehicleLedger::default();
        ledger.insert(reservation("2024-01-01", "2024-01-05"));
        ledger.insert(reservation("2024-02-18", "2024-02-20"));
        ledger.insert(reservation("2024-04-01", "2024-04-03"));

        let hits: Vec<_> = ledger
            .overlapping(&period("2024-02-20", "2024-02-28"))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].period, period("2024-02-18", "2024-02-20"));
    }

    #[test]
    fn overlapping_long_reservation_spanning_query() {
        let mut ledger = VehicleLedger::default();
        ledger.insert(reservation("2023-12-01", "2024-06-30"));
        let hits: Vec<_> = ledger
            .overlapping(&period("2024-02-20", "2024-02-22"))
            .collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn overlapping_empty_ledger() {
        let ledger = VehicleLedger::default();
        assert_eq!(ledger.overlapping(&period("2024-02-20", "2024-02-22")).count(), 0);
    }

    #[test]
    fn size_parses_case_insensitive() {
        assert_eq!("MIN".parse::<VehicleSize>().unwrap(), VehicleSize::Min);
        assert_eq!("Mid".parse::<VehicleSize>().unwrap(), VehicleSize::Mid);
        assert_eq!("large".parse::<VehicleSize>().unwrap(), VehicleSize::Large);
        assert!("huge".parse::<VehicleSize>().is_err());
    }

    #[test]
    fn vehicle_serializes_lowercase_size() {
        let v = Vehicle {
            id: VehicleId::from("01ARZ3NDEKTSV4RRFFQ69G5FAV"),
            model: "hyundai".into(),
            size: VehicleSize::Min,
            price_per_day: 100.0,
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["size"], "min");
        assert_eq!(json["id"], "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        let back: Vehicle = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn generated_ids_are_ulids() {
        let id = VehicleId::generate();
        assert!(Ulid::from_string(id.as_str()).is_ok());
    }
}
