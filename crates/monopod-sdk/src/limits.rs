use serde::{Deserialize, Serialize};

use crate::MeasurementKind;

/// Allowed range of one measurement. A value passes when `min <= value < max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    #[serde(default = "unbounded_below")]
    pub min: f64,
    #[serde(default = "unbounded_above")]
    pub max: f64,
}

fn unbounded_below() -> f64 {
    f64::NEG_INFINITY
}

fn unbounded_above() -> f64 {
    f64::INFINITY
}

impl Default for Limit {
    fn default() -> Self {
        Self::UNRESTRICTED
    }
}

impl Limit {
    pub const UNRESTRICTED: Limit = Limit {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Lower bound inclusive, upper bound exclusive. NaN never passes.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }
}

/// Fixed-slot `MeasurementKind -> Limit` table. Copying it never allocates, so
/// a whole-table snapshot is cheap enough for the control thread.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LimitTable {
    slots: [Option<Limit>; MeasurementKind::COUNT],
}

impl LimitTable {
    pub fn set(&mut self, kind: MeasurementKind, limit: Limit) {
        self.slots[kind.index()] = Some(limit);
    }

    pub fn get(&self, kind: MeasurementKind) -> Option<Limit> {
        self.slots[kind.index()]
    }

    pub fn clear(&mut self, kind: MeasurementKind) {
        self.slots[kind.index()] = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Configured entries in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (MeasurementKind, Limit)> + '_ {
        MeasurementKind::ALL
            .iter()
            .filter_map(|kind| self.slots[kind.index()].map(|limit| (*kind, limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let limit = Limit::new(-0.5, 0.5);
        assert!(limit.contains(-0.5));
        assert!(limit.contains(0.0));
        assert!(limit.contains(0.499));
        assert!(!limit.contains(0.5));
        assert!(!limit.contains(-0.51));
        assert!(!limit.contains(f64::NAN));
    }

    #[test]
    fn default_limit_is_unrestricted() {
        let limit = Limit::default();
        assert!(limit.contains(f64::MAX));
        assert!(limit.contains(f64::MIN));
    }

    #[test]
    fn table_tracks_configured_kinds() {
        let mut table = LimitTable::default();
        assert!(table.is_empty());

        table.set(MeasurementKind::Velocity, Limit::new(-1.0, 1.0));
        table.set(MeasurementKind::Position, Limit::new(-2.0, 2.0));
        let kinds: Vec<_> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![MeasurementKind::Position, MeasurementKind::Velocity]);

        table.clear(MeasurementKind::Position);
        assert_eq!(table.get(MeasurementKind::Position), None);
        assert_eq!(
            table.get(MeasurementKind::Velocity),
            Some(Limit::new(-1.0, 1.0))
        );
    }
}
