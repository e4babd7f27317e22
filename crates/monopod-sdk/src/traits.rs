use crate::{BoardError, JointId, MeasurementKind};

/// Append-only, time-indexed sample history owned by the board driver.
///
/// Implementations synchronize appends themselves; every method here is a
/// read and may be called from any thread.
pub trait MeasurementHistory: Send + Sync {
    /// Number of retained samples.
    fn length(&self) -> usize;

    /// Most recent sample, `None` while the history is empty.
    fn newest_element(&self) -> Option<f64>;

    /// Time index of the most recent sample, `None` while the history is empty.
    fn newest_timeindex(&self) -> Option<i64>;

    /// Sample recorded at `timeindex`. If that sample is no longer retained the
    /// oldest retained one is returned and `timeindex` is moved to it.
    fn element_at(&self, timeindex: &mut i64) -> Option<f64>;
}

/// Control board reachable over the field bus.
///
/// Joint slots are addressed by [`JointId`]. Calls that reach the bus
/// (`send_*`, `search_index`) may block on I/O and are never made while a
/// module lock is held.
pub trait ControlBoard: Send + Sync {
    /// Whether the bus connection to the board is up.
    fn is_live(&self) -> bool;

    /// Whether a device is wired to the given joint slot.
    fn has_slot(&self, joint: JointId) -> bool;

    /// Sample history of one measurement channel.
    fn measurement(&self, joint: JointId, kind: MeasurementKind) -> Option<&dyn MeasurementHistory>;

    /// Send one torque command, in actuator units.
    fn send_torque(&self, joint: JointId, torque: f64) -> Result<(), BoardError>;

    /// Send several torque commands within the same bus cycle.
    fn send_torques(&self, commands: &[(JointId, f64)]) -> Result<(), BoardError> {
        for (joint, torque) in commands {
            self.send_torque(*joint, *torque)?;
        }
        Ok(())
    }

    /// Run the encoder index search for one joint. Once this returns, the
    /// joint's `EncoderIndex` history holds the index position.
    fn search_index(&self, joint: JointId) -> Result<(), BoardError>;
}
