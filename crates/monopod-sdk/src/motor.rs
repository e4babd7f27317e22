use parking_lot::Mutex;
use tracing::warn;

use crate::board::Motor;
use crate::encoder::EncoderModule;
use crate::{BoardError, JointId, MeasurementKind, PidGains};

#[derive(Clone, Copy, Debug)]
struct MotorState {
    desired_torque: f64,
    max_torque: f64,
    pid: PidGains,
}

/// An encoder module that can also be commanded in torque.
pub struct MotorModule<'b> {
    encoder: EncoderModule<'b>,
    motor: Motor<'b>,
    state: Mutex<MotorState>,
}

impl<'b> MotorModule<'b> {
    pub fn new(
        joint: JointId,
        motor: Motor<'b>,
        gear_ratio: f64,
        zero_angle: f64,
        reverse_polarity: bool,
        max_torque: f64,
    ) -> Self {
        let max_torque = if max_torque.is_nan() {
            0.0
        } else {
            max_torque.abs()
        };
        Self {
            encoder: EncoderModule::new(
                joint,
                motor.encoder(),
                gear_ratio,
                zero_angle,
                reverse_polarity,
            ),
            motor,
            state: Mutex::new(MotorState {
                desired_torque: 0.0,
                max_torque,
                pid: PidGains::default(),
            }),
        }
    }

    pub fn encoder(&self) -> &EncoderModule<'b> {
        &self.encoder
    }

    pub fn joint(&self) -> JointId {
        self.encoder.joint()
    }

    /// Store `torque` clamped to `[-max_torque, max_torque]`. NaN stores zero.
    pub fn set_torque_target(&self, torque: f64) {
        let mut state = self.state.lock();
        if torque.is_nan() {
            warn!(joint = %self.joint(), "NaN torque target replaced by zero");
            state.desired_torque = 0.0;
            return;
        }
        state.desired_torque = torque.clamp(-state.max_torque, state.max_torque);
    }

    pub fn get_torque_target(&self) -> f64 {
        self.state.lock().desired_torque
    }

    /// Negative values are taken by magnitude; NaN is ignored. A pending target
    /// above the new bound is clamped right away.
    pub fn set_max_torque(&self, max_torque: f64) {
        if max_torque.is_nan() {
            warn!(joint = %self.joint(), "ignoring NaN max torque");
            return;
        }
        let mut state = self.state.lock();
        state.max_torque = max_torque.abs();
        state.desired_torque = state
            .desired_torque
            .clamp(-state.max_torque, state.max_torque);
    }

    pub fn max_torque(&self) -> f64 {
        self.state.lock().max_torque
    }

    pub fn set_pid(&self, pid: PidGains) {
        self.state.lock().pid = pid;
    }

    pub fn pid(&self) -> PidGains {
        self.state.lock().pid
    }

    /// Joint-side measured torque, NaN without samples.
    pub fn get_measured_torque(&self) -> f64 {
        self.encoder
            .measure(&self.encoder.calibration(), MeasurementKind::Torque)
    }

    /// The pending target converted to actuator units.
    pub fn actuator_command(&self) -> f64 {
        let calibration = self.encoder.calibration();
        let desired = self.get_torque_target();
        calibration.polarity * desired / calibration.gear_ratio
    }

    /// Dispatch the pending target. No lock is held during the bus call.
    pub fn send_torque(&self) -> Result<(), BoardError> {
        let command = self.actuator_command();
        self.motor.send_torque(command)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::mock::MockBoard;

    fn module(board: &MockBoard) -> MotorModule<'_> {
        MotorModule::new(JointId::Knee, Motor::new(board, JointId::Knee), 9.0, 0.0, false, 0.45)
    }

    #[test]
    fn torque_target_is_clamped() {
        let board = MockBoard::new();
        let motor = module(&board);

        motor.set_torque_target(10.0);
        assert_eq!(motor.get_torque_target(), 0.45);
        motor.set_torque_target(-10.0);
        assert_eq!(motor.get_torque_target(), -0.45);
        motor.set_torque_target(0.2);
        assert_eq!(motor.get_torque_target(), 0.2);
        motor.set_torque_target(f64::NAN);
        assert_eq!(motor.get_torque_target(), 0.0);
    }

    #[test]
    fn lowering_max_torque_clamps_pending_target() {
        let board = MockBoard::new();
        let motor = module(&board);
        motor.set_torque_target(0.4);
        motor.set_max_torque(-0.1);
        assert_eq!(motor.max_torque(), 0.1);
        assert_eq!(motor.get_torque_target(), 0.1);
    }

    #[test]
    fn send_converts_to_actuator_units() {
        let board = MockBoard::new();
        let motor = module(&board);
        motor.set_torque_target(0.45);
        motor.send_torque().unwrap();
        let sent = board.last_torque(JointId::Knee).unwrap();
        assert!((sent - 0.05).abs() < 1e-12);

        motor.encoder().set_joint_polarity(true);
        motor.send_torque().unwrap();
        let sent = board.last_torque(JointId::Knee).unwrap();
        assert!((sent + 0.05).abs() < 1e-12);
    }

    #[test]
    fn measured_torque_scales_with_gear_ratio() {
        let board = MockBoard::new();
        let motor = module(&board);
        assert!(motor.get_measured_torque().is_nan());

        board.push(JointId::Knee, MeasurementKind::Torque, 0.01);
        assert!((motor.get_measured_torque() - 0.09).abs() < 1e-12);
    }

    #[test]
    fn pid_defaults_to_zero() {
        let board = MockBoard::new();
        let motor = module(&board);
        assert_eq!(motor.pid(), PidGains::default());
        motor.set_pid(PidGains::new(5.0, 0.0, 0.1));
        assert_eq!(motor.pid().p, 5.0);
    }
}
