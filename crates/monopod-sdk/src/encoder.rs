//! Calibrated read access to one joint encoder, plus its safety limits.

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::board::Encoder;
use crate::limits::{Limit, LimitTable};
use crate::{JointId, MeasurementKind};

/// Conversion from actuator-side samples to joint-side values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub gear_ratio: f64,
    pub zero_angle: f64,
    /// `1.0` or `-1.0`.
    pub polarity: f64,
}

impl Calibration {
    pub fn new(gear_ratio: f64, zero_angle: f64, reverse_polarity: bool) -> Self {
        Self {
            gear_ratio,
            zero_angle,
            polarity: polarity_sign(reverse_polarity),
        }
    }
}

fn polarity_sign(reverse: bool) -> f64 {
    if reverse {
        -1.0
    } else {
        1.0
    }
}

/// Everything a supervisor may change on an encoder. Guarded by one lock.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EncoderState {
    pub(crate) calibration: Calibration,
    pub(crate) limits: LimitTable,
}

pub struct EncoderModule<'b> {
    joint: JointId,
    encoder: Encoder<'b>,
    state: Mutex<EncoderState>,
}

impl<'b> EncoderModule<'b> {
    pub fn new(
        joint: JointId,
        encoder: Encoder<'b>,
        gear_ratio: f64,
        zero_angle: f64,
        reverse_polarity: bool,
    ) -> Self {
        Self {
            joint,
            encoder,
            state: Mutex::new(EncoderState {
                calibration: Calibration::new(gear_ratio, zero_angle, reverse_polarity),
                limits: LimitTable::default(),
            }),
        }
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub(crate) fn encoder(&self) -> Encoder<'b> {
        self.encoder
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, EncoderState> {
        self.state.lock()
    }

    pub fn calibration(&self) -> Calibration {
        self.state.lock().calibration
    }

    pub fn gear_ratio(&self) -> f64 {
        self.state.lock().calibration.gear_ratio
    }

    pub fn polarity(&self) -> f64 {
        self.state.lock().calibration.polarity
    }

    pub fn set_zero_angle(&self, zero_angle: f64) {
        self.state.lock().calibration.zero_angle = zero_angle;
    }

    pub fn get_zero_angle(&self) -> f64 {
        self.state.lock().calibration.zero_angle
    }

    pub fn set_joint_polarity(&self, reverse_polarity: bool) {
        self.state.lock().calibration.polarity = polarity_sign(reverse_polarity);
    }

    /// Joint angle: `polarity * raw / gear_ratio - zero_angle`. NaN without samples.
    pub fn get_measured_angle(&self) -> f64 {
        self.measure(&self.calibration(), MeasurementKind::Position)
    }

    pub fn get_measured_velocity(&self) -> f64 {
        self.measure(&self.calibration(), MeasurementKind::Velocity)
    }

    pub fn get_measured_acceleration(&self) -> f64 {
        self.measure(&self.calibration(), MeasurementKind::Acceleration)
    }

    pub fn get_measured_index_angle(&self) -> f64 {
        self.measure(&self.calibration(), MeasurementKind::EncoderIndex)
    }

    /// Newest sample of `kind` with polarity applied, NaN without samples.
    pub fn get_joint_measurement(&self, kind: MeasurementKind) -> f64 {
        match self.newest_raw(kind) {
            Some(raw) => self.polarity() * raw,
            None => f64::NAN,
        }
    }

    /// Time index of the newest sample of `kind`, `-1` without samples.
    pub fn get_joint_measurement_index(&self, kind: MeasurementKind) -> i64 {
        let Some(history) = self.encoder.get_measurement(kind) else {
            return -1;
        };
        if history.length() == 0 {
            return -1;
        }
        history.newest_timeindex().unwrap_or(-1)
    }

    pub fn set_limit(&self, kind: MeasurementKind, limit: Limit) {
        self.state.lock().limits.set(kind, limit);
        debug!(joint = %self.joint, ?kind, min = limit.min, max = limit.max, "limit updated");
    }

    /// Configured limit, or the unrestricted default when none is set.
    pub fn get_limit(&self, kind: MeasurementKind) -> Limit {
        self.state.lock().limits.get(kind).unwrap_or_default()
    }

    pub fn clear_limit(&self, kind: MeasurementKind) {
        self.state.lock().limits.clear(kind);
    }

    pub fn limits(&self) -> LimitTable {
        self.state.lock().limits
    }

    /// True when every configured limit holds for the current measurements.
    ///
    /// The limit table and calibration are copied out under a single lock
    /// acquisition, so a concurrent `set_limit` is seen either fully or not at
    /// all. A NaN acceleration passes: most boards on the rig do not report it.
    pub fn check_limits(&self) -> bool {
        let state = *self.state.lock();
        for (kind, limit) in state.limits.iter() {
            if !self.within(&state.calibration, kind, &limit) {
                return false;
            }
        }
        true
    }

    /// Configured limits that currently fail, with the offending value.
    pub fn limit_violations(&self) -> Vec<(MeasurementKind, f64, Limit)> {
        let state = *self.state.lock();
        state
            .limits
            .iter()
            .filter(|(kind, limit)| !self.within(&state.calibration, *kind, limit))
            .map(|(kind, limit)| (kind, self.measure(&state.calibration, kind), limit))
            .collect()
    }

    fn within(&self, calibration: &Calibration, kind: MeasurementKind, limit: &Limit) -> bool {
        let value = self.measure(calibration, kind);
        if value.is_nan() && kind == MeasurementKind::Acceleration {
            return true;
        }
        limit.contains(value)
    }

    /// Joint-side value of `kind` under `calibration`.
    pub(crate) fn measure(&self, calibration: &Calibration, kind: MeasurementKind) -> f64 {
        let Some(raw) = self.newest_raw(kind) else {
            return f64::NAN;
        };
        let signed = calibration.polarity * raw;
        match kind {
            MeasurementKind::Position => signed / calibration.gear_ratio - calibration.zero_angle,
            MeasurementKind::Velocity
            | MeasurementKind::Acceleration
            | MeasurementKind::EncoderIndex => signed / calibration.gear_ratio,
            // Torque scales up through the gearbox.
            MeasurementKind::Torque => signed * calibration.gear_ratio,
        }
    }

    fn newest_raw(&self, kind: MeasurementKind) -> Option<f64> {
        let history = self.encoder.get_measurement(kind)?;
        if history.length() == 0 {
            return None;
        }
        history.newest_element()
    }
}
