//! Joints that are read and commanded together within one control tick.

use core::ops::Index;
use parking_lot::MutexGuard;
use tracing::{debug, error};

use crate::encoder::EncoderState;
use crate::joint::JointModule;
use crate::metrics::MonopodMetrics;
use crate::motor::MotorModule;
use crate::{ControlBoard, JointId, MeasurementKind, MonopodError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKind {
    Leg,
    Planarizer,
}

impl GroupKind {
    pub fn members(self) -> &'static [JointId] {
        match self {
            GroupKind::Leg => &[JointId::Hip, JointId::Knee],
            GroupKind::Planarizer => &[
                JointId::BoomConnector,
                JointId::PlanarizerYaw,
                JointId::PlanarizerPitch,
            ],
        }
    }
}

/// Latest joint-side value of every measurement kind for one joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointMeasurements {
    values: [f64; MeasurementKind::COUNT],
}

impl JointMeasurements {
    pub fn get(&self, kind: MeasurementKind) -> f64 {
        self.values[kind.index()]
    }

    pub fn position(&self) -> f64 {
        self.get(MeasurementKind::Position)
    }

    pub fn velocity(&self) -> f64 {
        self.get(MeasurementKind::Velocity)
    }

    pub fn acceleration(&self) -> f64 {
        self.get(MeasurementKind::Acceleration)
    }

    pub fn torque(&self) -> f64 {
        self.get(MeasurementKind::Torque)
    }

    pub fn index_angle(&self) -> f64 {
        self.get(MeasurementKind::EncoderIndex)
    }
}

impl Index<MeasurementKind> for JointMeasurements {
    type Output = f64;

    fn index(&self, kind: MeasurementKind) -> &f64 {
        &self.values[kind.index()]
    }
}

/// Measurements of every group member taken as one consistent set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupSnapshot {
    joints: [Option<JointMeasurements>; JointId::COUNT],
}

impl GroupSnapshot {
    pub fn get(&self, joint: JointId) -> Option<&JointMeasurements> {
        self.joints[joint.index()].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, &JointMeasurements)> + '_ {
        JointId::ALL
            .iter()
            .filter_map(|id| self.joints[id.index()].as_ref().map(|m| (*id, m)))
    }
}

/// Ordered set of registry joints borrowed for synchronized access.
pub struct JointGroup<'r, 'b> {
    kind: GroupKind,
    board: &'b dyn ControlBoard,
    members: Vec<&'r JointModule<'b>>,
    metrics: Option<&'r MonopodMetrics>,
}

impl<'r, 'b> JointGroup<'r, 'b> {
    pub(crate) fn new(
        kind: GroupKind,
        board: &'b dyn ControlBoard,
        members: Vec<&'r JointModule<'b>>,
        metrics: Option<&'r MonopodMetrics>,
    ) -> Self {
        Self {
            kind,
            board,
            members,
            metrics,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn joint_ids(&self) -> impl Iterator<Item = JointId> + '_ {
        self.members.iter().map(|m| m.joint())
    }

    /// One snapshot of every member. All member locks are held, in member
    /// order, while the samples are read.
    pub fn get_measurements(&self) -> GroupSnapshot {
        let guards = self.lock_members();

        let mut snapshot = GroupSnapshot::default();
        for (member, guard) in self.members.iter().zip(guards.iter()) {
            let Some(state) = guard else { continue };
            let encoder = member.encoder();
            let values = MeasurementKind::ALL.map(|kind| encoder.measure(&state.calibration, kind));
            snapshot.joints[member.joint().index()] = Some(JointMeasurements { values });
        }
        snapshot
    }

    /// Set one torque target per member, in member order. Nothing is written
    /// unless the length matches and every member carries a motor.
    pub fn set_target_torques(&self, torques: &[f64]) -> Result<()> {
        if torques.len() != self.members.len() {
            return Err(MonopodError::SizeMismatch {
                expected: self.members.len(),
                actual: torques.len(),
            });
        }
        if let Some(member) = self.members.iter().find(|m| m.motor().is_none()) {
            return Err(MonopodError::UnwritableJoint(member.joint()));
        }
        for (member, torque) in self.members.iter().zip(torques) {
            if let Some(motor) = member.motor() {
                motor.set_torque_target(*torque);
            }
        }
        Ok(())
    }

    /// Dispatch every pending target in a single board call so all members
    /// are commanded within the same bus cycle.
    pub fn send_target_torques(&self) -> Result<()> {
        let mut motors = [None; JointId::COUNT];
        for (slot, member) in motors.iter_mut().zip(&self.members) {
            *slot = Some(
                member
                    .motor()
                    .ok_or(MonopodError::UnwritableJoint(member.joint()))?,
            );
        }
        dispatch_batch(self.board, motors.into_iter().flatten(), self.metrics)
            .inspect_err(|e| error!(group = ?self.kind, "torque dispatch failed: {e}"))
    }

    /// Replace the zero angle of every member, in member order, while all
    /// member locks are held. A concurrent snapshot sees either all old or
    /// all new angles.
    pub fn set_zero_angles(&self, zero_angles: &[f64]) -> Result<()> {
        if zero_angles.len() != self.members.len() {
            return Err(MonopodError::SizeMismatch {
                expected: self.members.len(),
                actual: zero_angles.len(),
            });
        }
        let mut guards = self.lock_members();
        for (guard, zero_angle) in guards.iter_mut().flatten().zip(zero_angles) {
            guard.calibration.zero_angle = *zero_angle;
        }
        Ok(())
    }

    pub fn check_limits(&self) -> bool {
        self.members.iter().all(|m| m.encoder().check_limits())
    }

    // Always acquired in member order, so two group operations cannot deadlock.
    fn lock_members(&self) -> [Option<MutexGuard<'_, EncoderState>>; JointId::COUNT] {
        core::array::from_fn(|i| self.members.get(i).map(|m| m.encoder().lock()))
    }
}

/// Convert each pending target to actuator units and send them all in one
/// `send_torques` call. Sends nothing when `motors` is empty.
pub(crate) fn dispatch_batch<'m, 'b: 'm>(
    board: &dyn ControlBoard,
    motors: impl Iterator<Item = &'m MotorModule<'b>>,
    metrics: Option<&MonopodMetrics>,
) -> Result<()> {
    let mut commands = [(JointId::Hip, 0.0); JointId::COUNT];
    let mut count = 0;
    for (slot, motor) in commands.iter_mut().zip(motors) {
        *slot = (motor.joint(), motor.actuator_command());
        count += 1;
    }
    if count == 0 {
        return Ok(());
    }
    let commands = &commands[..count];

    board.send_torques(commands)?;
    if let Some(metrics) = metrics {
        metrics.torque_dispatches.inc();
    }
    debug!(count, "torques dispatched");
    Ok(())
}
