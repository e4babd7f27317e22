//! The monopod: every joint module of the rig, keyed by joint id.
//!
//! Nothing is reachable until [`Monopod::initialize`] has resolved a [`Mode`]
//! against a live board. Getters answer `None` and setters `Err` for an
//! uninitialized registry or a joint outside the active read/write set, and
//! neither touches the board in that case.

use tracing::{debug, error, info, warn};

use crate::board::{Encoder, Motor};
use crate::config::RigConfig;
use crate::encoder::EncoderModule;
use crate::group::{dispatch_batch, GroupKind, JointGroup};
use crate::joint::JointModule;
use crate::limits::Limit;
use crate::metrics::MonopodMetrics;
use crate::motor::MotorModule;
use crate::{
    ControlBoard, JointId, JointSettingState, MeasurementKind, Mode, MonopodError, PidGains,
    Result,
};

pub struct Monopod<'b> {
    config: RigConfig,
    board: Option<&'b dyn ControlBoard>,
    joints: [Option<JointModule<'b>>; JointId::COUNT],
    read_joint_indexing: Vec<JointId>,
    write_joint_indexing: Vec<JointId>,
    mode: Option<Mode>,
    initialized: bool,
    metrics: Option<MonopodMetrics>,
}

impl Default for Monopod<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b> Monopod<'b> {
    /// Registry using the built-in calibration of the rig.
    pub fn new() -> Self {
        Self::from_validated(RigConfig::default())
    }

    pub fn with_config(config: RigConfig) -> Result<Self> {
        config.validate().map_err(MonopodError::InvalidConfig)?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: RigConfig) -> Self {
        Self {
            config,
            board: None,
            joints: Default::default(),
            read_joint_indexing: Vec::new(),
            write_joint_indexing: Vec::new(),
            mode: None,
            initialized: false,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MonopodMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&MonopodMetrics> {
        self.metrics.as_ref()
    }

    /// Resolve `mode`, check that `board` is live and wired for every joint
    /// the mode reads, and build the joint modules.
    ///
    /// Calling this again once initialized is a no-op that returns `Ok`. On
    /// failure the registry is left exactly as it was.
    pub fn initialize(&mut self, mode: Mode, board: &'b dyn ControlBoard) -> Result<()> {
        if self.initialized {
            debug!(mode = ?self.mode, "monopod already initialized");
            return Ok(());
        }

        let indexing = mode.resolve().map_err(MonopodError::InvalidMode)?;
        if !board.is_live() {
            error!("control board is not live");
            return Err(MonopodError::BoardUnavailable(
                "control board is not live".to_string(),
            ));
        }
        if let Some(missing) = indexing.read.iter().find(|id| !board.has_slot(**id)) {
            error!(joint = %missing, "control board has no slot for joint");
            return Err(crate::BoardError::MissingSlot(*missing).into());
        }

        let mut joints: [Option<JointModule<'b>>; JointId::COUNT] = Default::default();
        for id in &indexing.read {
            let settings = self.config.joint_or_default(*id);
            let gear_ratio = settings.gear_ratio_or_default(*id);
            let module = if indexing.write.contains(id) {
                let motor = MotorModule::new(
                    *id,
                    Motor::new(board, *id),
                    gear_ratio,
                    settings.zero_angle,
                    settings.reverse_polarity,
                    settings.max_torque_or_default(),
                );
                motor.set_pid(settings.pid);
                JointModule::EncoderAndMotor(motor)
            } else {
                JointModule::EncoderOnly(EncoderModule::new(
                    *id,
                    Encoder::new(board, *id),
                    gear_ratio,
                    settings.zero_angle,
                    settings.reverse_polarity,
                ))
            };
            let encoder = module.encoder();
            let limits = [
                (MeasurementKind::Position, settings.position_limit),
                (MeasurementKind::Velocity, settings.velocity_limit),
                (MeasurementKind::Acceleration, settings.acceleration_limit),
            ];
            for (kind, limit) in limits {
                if let Some(limit) = limit {
                    encoder.set_limit(kind, limit);
                }
            }
            joints[id.index()] = Some(module);
        }

        if let Some(metrics) = &self.metrics {
            metrics.active_joints.set(indexing.read.len() as i64);
        }
        info!(
            model = %self.config.model_name,
            ?mode,
            read = ?indexing.read,
            write = ?indexing.write,
            "monopod initialized"
        );
        self.joints = joints;
        self.read_joint_indexing = indexing.read;
        self.write_joint_indexing = indexing.write;
        self.board = Some(board);
        self.mode = Some(mode);
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mode(&self) -> Option<&Mode> {
        self.mode.as_ref()
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Names of the joints in the read set, in joint id order.
    pub fn joint_names(&self) -> Vec<&'static str> {
        self.read_joint_indexing.iter().map(|id| id.name()).collect()
    }

    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        crate::joint_id(name)
    }

    pub fn read_joints(&self) -> &[JointId] {
        &self.read_joint_indexing
    }

    pub fn write_joints(&self) -> &[JointId] {
        &self.write_joint_indexing
    }

    pub fn is_joint_controllable(&self, joint: JointId) -> bool {
        self.write_joint_indexing.contains(&joint)
    }

    // Torque

    pub fn set_torque_target(&self, joint: JointId, torque: f64) -> Result<()> {
        let motor = self.writable(joint).inspect_err(|e| self.reject("set_torque_target", e))?;
        motor.set_torque_target(torque);
        Ok(())
    }

    /// Set one target per id. An empty `joints` addresses the whole write
    /// set. Nothing is written unless every id is writable and the lengths
    /// match.
    pub fn set_torque_targets(&self, joints: &[JointId], torques: &[f64]) -> Result<()> {
        let result = self.writable_batch(joints).and_then(|motors| {
            if motors.len() != torques.len() {
                return Err(MonopodError::SizeMismatch {
                    expected: motors.len(),
                    actual: torques.len(),
                });
            }
            Ok(motors)
        });
        let motors = result.inspect_err(|e| self.reject("set_torque_targets", e))?;
        for (motor, torque) in motors.iter().zip(torques) {
            motor.set_torque_target(*torque);
        }
        Ok(())
    }

    pub fn get_torque_target(&self, joint: JointId) -> Option<f64> {
        self.writable(joint)
            .inspect_err(|e| self.reject("get_torque_target", e))
            .ok()
            .map(MotorModule::get_torque_target)
    }

    pub fn get_torque_targets(&self, joints: &[JointId]) -> Option<Vec<f64>> {
        let motors = self
            .writable_batch(joints)
            .inspect_err(|e| self.reject("get_torque_targets", e))
            .ok()?;
        Some(motors.iter().map(|m| m.get_torque_target()).collect())
    }

    /// Dispatch the pending targets of the whole write set in one board call.
    pub fn send_torque_targets(&self) -> Result<()> {
        let board = self.board().inspect_err(|e| self.reject("send_torque_targets", e))?;
        let motors = self
            .write_joint_indexing
            .iter()
            .filter_map(|id| self.joints[id.index()].as_ref())
            .filter_map(JointModule::motor);
        dispatch_batch(board, motors, self.metrics.as_ref())
            .inspect_err(|e| error!("torque dispatch failed: {e}"))
    }

    pub fn set_max_torque_target(&self, joint: JointId, max_torque: f64) -> Result<()> {
        let motor = self
            .writable(joint)
            .inspect_err(|e| self.reject("set_max_torque_target", e))?;
        motor.set_max_torque(max_torque);
        Ok(())
    }

    pub fn get_max_torque_target(&self, joint: JointId) -> Option<f64> {
        self.writable(joint)
            .inspect_err(|e| self.reject("get_max_torque_target", e))
            .ok()
            .map(MotorModule::max_torque)
    }

    pub fn set_pid(&self, joint: JointId, pid: PidGains) -> Result<()> {
        let motor = self.writable(joint).inspect_err(|e| self.reject("set_pid", e))?;
        motor.set_pid(pid);
        Ok(())
    }

    pub fn get_pid(&self, joint: JointId) -> Option<PidGains> {
        self.writable(joint)
            .inspect_err(|e| self.reject("get_pid", e))
            .ok()
            .map(MotorModule::pid)
    }

    // Measurements

    pub fn get_position(&self, joint: JointId) -> Option<f64> {
        self.measured("get_position", joint, EncoderModule::get_measured_angle)
    }

    pub fn get_velocity(&self, joint: JointId) -> Option<f64> {
        self.measured("get_velocity", joint, EncoderModule::get_measured_velocity)
    }

    pub fn get_acceleration(&self, joint: JointId) -> Option<f64> {
        self.measured("get_acceleration", joint, EncoderModule::get_measured_acceleration)
    }

    pub fn get_measured_torque(&self, joint: JointId) -> Option<f64> {
        self.measured("get_measured_torque", joint, |encoder| {
            encoder.measure(&encoder.calibration(), MeasurementKind::Torque)
        })
    }

    /// Joint angles in id order. Entries are NaN for joints without samples;
    /// the whole call is `None` if any id is not readable.
    pub fn get_positions(&self, joints: &[JointId]) -> Option<Vec<f64>> {
        self.measured_batch("get_positions", joints, EncoderModule::get_measured_angle)
    }

    pub fn get_velocities(&self, joints: &[JointId]) -> Option<Vec<f64>> {
        self.measured_batch("get_velocities", joints, EncoderModule::get_measured_velocity)
    }

    pub fn get_accelerations(&self, joints: &[JointId]) -> Option<Vec<f64>> {
        self.measured_batch(
            "get_accelerations",
            joints,
            EncoderModule::get_measured_acceleration,
        )
    }

    pub fn get_measured_torques(&self, joints: &[JointId]) -> Option<Vec<f64>> {
        self.measured_batch("get_measured_torques", joints, |encoder| {
            encoder.measure(&encoder.calibration(), MeasurementKind::Torque)
        })
    }

    // Limits

    pub fn set_joint_position_limit(&self, joint: JointId, limit: Limit) -> Result<()> {
        self.set_limit("set_joint_position_limit", joint, MeasurementKind::Position, limit)
    }

    pub fn set_joint_velocity_limit(&self, joint: JointId, limit: Limit) -> Result<()> {
        self.set_limit("set_joint_velocity_limit", joint, MeasurementKind::Velocity, limit)
    }

    pub fn set_joint_acceleration_limit(&self, joint: JointId, limit: Limit) -> Result<()> {
        self.set_limit(
            "set_joint_acceleration_limit",
            joint,
            MeasurementKind::Acceleration,
            limit,
        )
    }

    pub fn get_joint_position_limit(&self, joint: JointId) -> Option<Limit> {
        self.get_limit("get_joint_position_limit", joint, MeasurementKind::Position)
    }

    pub fn get_joint_velocity_limit(&self, joint: JointId) -> Option<Limit> {
        self.get_limit("get_joint_velocity_limit", joint, MeasurementKind::Velocity)
    }

    pub fn get_joint_acceleration_limit(&self, joint: JointId) -> Option<Limit> {
        self.get_limit(
            "get_joint_acceleration_limit",
            joint,
            MeasurementKind::Acceleration,
        )
    }

    pub fn get_joint_settings(&self, joint: JointId) -> Option<JointSettingState> {
        self.readable(joint)
            .inspect_err(|e| self.reject("get_joint_settings", e))
            .ok()
            .map(JointModule::settings)
    }

    /// Evaluate the limits of one joint. Violations are logged and counted,
    /// actuation is never stopped from here.
    pub fn check_limits(&self, joint: JointId) -> Option<bool> {
        let module = self
            .readable(joint)
            .inspect_err(|e| self.reject("check_limits", e))
            .ok()?;
        Some(self.evaluate_limits(module))
    }

    /// Evaluate every joint in the read set. All joints are checked even
    /// after the first violation so each one gets logged.
    pub fn check_all_limits(&self) -> Option<bool> {
        self.ensure_initialized()
            .inspect_err(|e| self.reject("check_all_limits", e))
            .ok()?;
        let mut ok = true;
        for module in self.active_modules() {
            ok &= self.evaluate_limits(module);
        }
        Some(ok)
    }

    // Groups

    pub fn leg(&self) -> Option<JointGroup<'_, 'b>> {
        self.group(GroupKind::Leg)
    }

    pub fn planarizer(&self) -> Option<JointGroup<'_, 'b>> {
        self.group(GroupKind::Planarizer)
    }

    /// Group handle, `None` unless every member is in the read set.
    pub fn group(&self, kind: GroupKind) -> Option<JointGroup<'_, 'b>> {
        let board = self.board().inspect_err(|e| self.reject("group", e)).ok()?;
        let members = kind
            .members()
            .iter()
            .map(|id| self.readable(*id))
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| self.reject("group", e))
            .ok()?;
        Some(JointGroup::new(kind, board, members, self.metrics.as_ref()))
    }

    // Calibration

    /// Run the board's index search on the hip and knee, then set each zero
    /// angle to `index_angle + offset` so the home position reads zero.
    ///
    /// Zero angles are applied only once every search has succeeded; a failed
    /// search leaves all calibration untouched.
    pub fn calibrate(&self, hip_offset: f64, knee_offset: f64) -> Result<()> {
        self.ensure_initialized()
            .inspect_err(|e| self.reject("calibrate", e))?;

        let targets = [(JointId::Hip, hip_offset), (JointId::Knee, knee_offset)];
        let mut zeroes: Vec<(&EncoderModule<'b>, f64)> = Vec::with_capacity(targets.len());
        for (joint, offset) in targets {
            let Ok(module) = self.readable(joint) else {
                continue;
            };
            let encoder = module.encoder();
            encoder.encoder().search_index().inspect_err(|e| {
                error!(%joint, "index search failed: {e}");
            })?;
            let index_angle = encoder.get_measured_index_angle();
            if index_angle.is_nan() {
                error!(%joint, "index search left no index sample");
                return Err(MonopodError::NoData(joint));
            }
            debug!(%joint, index_angle, offset, "index found");
            zeroes.push((encoder, index_angle + offset));
        }

        if zeroes.is_empty() {
            let err = MonopodError::UnreadableJoint(JointId::Hip);
            self.reject("calibrate", &err);
            return Err(err);
        }
        for (encoder, zero_angle) in zeroes {
            encoder.set_zero_angle(zero_angle);
            info!(joint = %encoder.joint(), zero_angle, "joint calibrated");
        }
        Ok(())
    }

    // Access helpers

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(MonopodError::NotInitialized)
        }
    }

    fn board(&self) -> Result<&'b dyn ControlBoard> {
        self.ensure_initialized()?;
        self.board.ok_or(MonopodError::NotInitialized)
    }

    fn readable(&self, joint: JointId) -> Result<&JointModule<'b>> {
        self.ensure_initialized()?;
        if !self.read_joint_indexing.contains(&joint) {
            return Err(MonopodError::UnreadableJoint(joint));
        }
        self.joints[joint.index()]
            .as_ref()
            .ok_or(MonopodError::UnreadableJoint(joint))
    }

    fn writable(&self, joint: JointId) -> Result<&MotorModule<'b>> {
        self.ensure_initialized()?;
        if !self.write_joint_indexing.contains(&joint) {
            return Err(MonopodError::UnwritableJoint(joint));
        }
        self.joints[joint.index()]
            .as_ref()
            .and_then(JointModule::motor)
            .ok_or(MonopodError::UnwritableJoint(joint))
    }

    fn readable_batch(&self, joints: &[JointId]) -> Result<Vec<&JointModule<'b>>> {
        self.ensure_initialized()?;
        let joints = if joints.is_empty() {
            &self.read_joint_indexing[..]
        } else {
            joints
        };
        joints.iter().map(|id| self.readable(*id)).collect()
    }

    fn writable_batch(&self, joints: &[JointId]) -> Result<Vec<&MotorModule<'b>>> {
        self.ensure_initialized()?;
        let joints = if joints.is_empty() {
            &self.write_joint_indexing[..]
        } else {
            joints
        };
        joints.iter().map(|id| self.writable(*id)).collect()
    }

    fn active_modules(&self) -> impl Iterator<Item = &JointModule<'b>> + '_ {
        self.read_joint_indexing
            .iter()
            .filter_map(|id| self.joints[id.index()].as_ref())
    }

    fn reject(&self, op: &'static str, err: &MonopodError) {
        warn!(op, "monopod access rejected: {err}");
        if let Some(metrics) = &self.metrics {
            metrics.rejected_accesses.inc();
        }
    }

    fn measured(
        &self,
        op: &'static str,
        joint: JointId,
        read: impl FnOnce(&EncoderModule<'b>) -> f64,
    ) -> Option<f64> {
        let module = self.readable(joint).inspect_err(|e| self.reject(op, e)).ok()?;
        let value = read(module.encoder());
        if value.is_nan() {
            debug!(op, %joint, "{}", MonopodError::NoData(joint));
            return None;
        }
        Some(value)
    }

    fn measured_batch(
        &self,
        op: &'static str,
        joints: &[JointId],
        read: impl Fn(&EncoderModule<'b>) -> f64,
    ) -> Option<Vec<f64>> {
        let modules = self
            .readable_batch(joints)
            .inspect_err(|e| self.reject(op, e))
            .ok()?;
        Some(modules.iter().map(|m| read(m.encoder())).collect())
    }

    fn set_limit(
        &self,
        op: &'static str,
        joint: JointId,
        kind: MeasurementKind,
        limit: Limit,
    ) -> Result<()> {
        let module = self.readable(joint).inspect_err(|e| self.reject(op, e))?;
        module.encoder().set_limit(kind, limit);
        Ok(())
    }

    fn get_limit(&self, op: &'static str, joint: JointId, kind: MeasurementKind) -> Option<Limit> {
        self.readable(joint)
            .inspect_err(|e| self.reject(op, e))
            .ok()
            .map(|module| module.encoder().get_limit(kind))
    }

    fn evaluate_limits(&self, module: &JointModule<'b>) -> bool {
        let encoder = module.encoder();
        if encoder.check_limits() {
            return true;
        }
        for (kind, value, limit) in encoder.limit_violations() {
            warn!(
                joint = %module.joint(),
                ?kind,
                value,
                min = limit.min,
                max = limit.max,
                "joint outside its limit"
            );
        }
        if let Some(metrics) = &self.metrics {
            metrics.limit_violations.inc();
        }
        false
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::mock::MockBoard;

    #[test]
    fn full_rig_reads_everything_and_writes_the_leg() {
        let board = MockBoard::new();
        let mut monopod = Monopod::new();
        monopod.initialize(Mode::FullRig, &board).unwrap();

        assert_eq!(monopod.joint_names().len(), 5);
        assert!(monopod.is_joint_controllable(JointId::Knee));
        assert!(!monopod.is_joint_controllable(JointId::PlanarizerYaw));
        assert_eq!(
            monopod.set_torque_target(JointId::PlanarizerYaw, 0.1),
            Err(MonopodError::UnwritableJoint(JointId::PlanarizerYaw))
        );
        assert_eq!(monopod.get_pid(JointId::BoomConnector), None);
        assert!(monopod.get_joint_position_limit(JointId::BoomConnector).is_some());
    }

    #[test]
    fn invalid_mode_leaves_registry_untouched() {
        let board = MockBoard::new();
        let mut monopod = Monopod::new();
        let mode = Mode::Custom {
            read: vec![JointId::Hip],
            write: vec![JointId::Knee],
        };
        assert!(matches!(
            monopod.initialize(mode, &board),
            Err(MonopodError::InvalidMode(_))
        ));
        assert!(!monopod.is_initialized());
        assert!(monopod.mode().is_none());
    }

    #[test]
    fn single_getter_maps_missing_samples_to_none() {
        let board = MockBoard::new();
        let mut monopod = Monopod::new();
        monopod.initialize(Mode::LegOnly, &board).unwrap();

        assert_eq!(monopod.get_velocity(JointId::Hip), None);
        let velocities = monopod.get_velocities(&[]).unwrap();
        assert_eq!(velocities.len(), 2);
        assert!(velocities.iter().all(|v| v.is_nan()));

        board.push(JointId::Hip, MeasurementKind::Velocity, 9.0);
        assert_eq!(monopod.get_velocity(JointId::Hip), Some(1.0));
    }

    #[test]
    fn config_seeds_limits_and_pid() {
        let mut config = RigConfig::default();
        config.joints[0].position_limit = Some(Limit::new(-1.0, 1.0));
        config.joints[0].pid = PidGains::new(2.0, 0.0, 0.05);
        let board = MockBoard::new();
        let mut monopod = Monopod::with_config(config).unwrap();
        monopod.initialize(Mode::LegOnly, &board).unwrap();

        assert_eq!(
            monopod.get_joint_position_limit(JointId::Hip),
            Some(Limit::new(-1.0, 1.0))
        );
        assert_eq!(monopod.get_pid(JointId::Hip), Some(PidGains::new(2.0, 0.0, 0.05)));
        let settings = monopod.get_joint_settings(JointId::Hip).unwrap();
        assert!((settings.max_torque_target - 0.45).abs() < 1e-12);
    }

    #[test]
    fn with_config_rejects_unknown_joint() {
        let mut config = RigConfig::default();
        config.joints[2].name = "tail_joint".into();
        assert!(matches!(
            Monopod::with_config(config),
            Err(MonopodError::InvalidConfig(_))
        ));
    }
}
