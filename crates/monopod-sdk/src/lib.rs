//! monopod-sdk: joint modules and joint registry for the monopod test rig
//!
//! Raw samples recorded by the control board are turned into calibrated joint
//! state, checked against per-joint safety limits, and exposed through a
//! registry that a real-time control loop and slower supervisory threads can
//! share. The default build enables a `mock` board so everything runs without
//! hardware attached.

mod types;
pub use types::{
    joint_id, JointId, JointIndexing, JointSettingState, MeasurementKind, Mode, PidGains,
    JOINT_NAMES,
};

mod error;
pub use error::{BoardError, MonopodError, Result};

mod traits;
pub use traits::{ControlBoard, MeasurementHistory};

mod limits;
pub use limits::{Limit, LimitTable};

mod board;
pub use board::{Encoder, Motor};

mod encoder;
pub use encoder::{Calibration, EncoderModule};

mod motor;
pub use motor::MotorModule;

mod joint;
pub use joint::JointModule;

mod group;
pub use group::{GroupKind, GroupSnapshot, JointGroup, JointMeasurements};

mod registry;
pub use registry::Monopod;

mod config;
pub use config::{load_rig_config, JointConfig, RigConfig};

mod metrics;
pub use metrics::MonopodMetrics;

pub mod constants;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBoard, SampleHistory};
