pub const MODEL_NAME: &str = "open_sim2real_monopod";

// Leg actuators.
pub const MOTOR_GEAR_RATIO: f64 = 9.0;
pub const MOTOR_TORQUE_CONSTANT: f64 = 0.025; // Nm/A
pub const MOTOR_MAX_CURRENT: f64 = 2.0; // A

/// Joint-side torque the leg motors are clamped to unless configured otherwise.
pub const DEFAULT_MAX_TORQUE: f64 = MOTOR_TORQUE_CONSTANT * MOTOR_MAX_CURRENT * MOTOR_GEAR_RATIO;

// Planarizer and boom encoders read joint-side angles directly.
pub const ENCODER_GEAR_RATIO: f64 = 1.0;
