use crate::encoder::EncoderModule;
use crate::motor::MotorModule;
use crate::{JointId, JointSettingState, MeasurementKind};

/// A registered joint. Encoder operations are always available; torque
/// operations only on joints that carry a motor.
pub enum JointModule<'b> {
    EncoderOnly(EncoderModule<'b>),
    EncoderAndMotor(MotorModule<'b>),
}

impl<'b> JointModule<'b> {
    pub fn joint(&self) -> JointId {
        self.encoder().joint()
    }

    pub fn encoder(&self) -> &EncoderModule<'b> {
        match self {
            JointModule::EncoderOnly(encoder) => encoder,
            JointModule::EncoderAndMotor(motor) => motor.encoder(),
        }
    }

    pub fn motor(&self) -> Option<&MotorModule<'b>> {
        match self {
            JointModule::EncoderOnly(_) => None,
            JointModule::EncoderAndMotor(motor) => Some(motor),
        }
    }

    pub fn is_controllable(&self) -> bool {
        matches!(self, JointModule::EncoderAndMotor(_))
    }

    pub fn settings(&self) -> JointSettingState {
        let encoder = self.encoder();
        JointSettingState {
            max_torque_target: self.motor().map_or(0.0, MotorModule::max_torque),
            position_limit: encoder.get_limit(MeasurementKind::Position),
            velocity_limit: encoder.get_limit(MeasurementKind::Velocity),
            acceleration_limit: encoder.get_limit(MeasurementKind::Acceleration),
        }
    }
}
