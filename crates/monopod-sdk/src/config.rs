use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{DEFAULT_MAX_TORQUE, ENCODER_GEAR_RATIO, MODEL_NAME, MOTOR_GEAR_RATIO};
use crate::limits::Limit;
use crate::{joint_id, JointId, PidGains};

/// Calibration and safety envelope of the whole rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub joints: Vec<JointConfig>,
}

fn default_model_name() -> String {
    MODEL_NAME.to_string()
}

/// Per-joint entry, looked up by joint name. Anything left out falls back to
/// the built-in default for that joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub name: String,
    #[serde(default)]
    pub gear_ratio: Option<f64>,
    #[serde(default)]
    pub zero_angle: f64,
    #[serde(default)]
    pub reverse_polarity: bool,
    #[serde(default)]
    pub max_torque: Option<f64>,
    #[serde(default)]
    pub pid: PidGains,
    #[serde(default)]
    pub position_limit: Option<Limit>,
    #[serde(default)]
    pub velocity_limit: Option<Limit>,
    #[serde(default)]
    pub acceleration_limit: Option<Limit>,
}

impl JointConfig {
    pub fn defaults_for(joint: JointId) -> Self {
        Self {
            name: joint.name().to_string(),
            gear_ratio: Some(default_gear_ratio(joint)),
            zero_angle: 0.0,
            reverse_polarity: false,
            max_torque: Some(DEFAULT_MAX_TORQUE),
            pid: PidGains::default(),
            position_limit: None,
            velocity_limit: None,
            acceleration_limit: None,
        }
    }

    pub fn gear_ratio_or_default(&self, joint: JointId) -> f64 {
        self.gear_ratio.unwrap_or_else(|| default_gear_ratio(joint))
    }

    pub fn max_torque_or_default(&self) -> f64 {
        self.max_torque.unwrap_or(DEFAULT_MAX_TORQUE)
    }
}

fn default_gear_ratio(joint: JointId) -> f64 {
    match joint {
        JointId::Hip | JointId::Knee => MOTOR_GEAR_RATIO,
        _ => ENCODER_GEAR_RATIO,
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            joints: JointId::ALL.iter().map(|id| JointConfig::defaults_for(*id)).collect(),
        }
    }
}

impl RigConfig {
    pub fn joint(&self, joint: JointId) -> Option<&JointConfig> {
        self.joints.iter().find(|j| j.name == joint.name())
    }

    pub fn joint_or_default(&self, joint: JointId) -> JointConfig {
        self.joint(joint)
            .cloned()
            .unwrap_or_else(|| JointConfig::defaults_for(joint))
    }

    /// Reject unknown or duplicate joint names, unusable gear ratios and
    /// limits no measurement could ever satisfy.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = [false; JointId::COUNT];
        for entry in &self.joints {
            let id = joint_id(&entry.name)
                .ok_or_else(|| format!("unknown joint '{}'", entry.name))?;
            if std::mem::replace(&mut seen[id.index()], true) {
                return Err(format!("joint '{}' listed twice", entry.name));
            }
            if let Some(ratio) = entry.gear_ratio {
                if !ratio.is_finite() || ratio <= 0.0 {
                    return Err(format!(
                        "joint '{}': gear ratio must be positive, got {ratio}",
                        entry.name
                    ));
                }
            }
            let limits = [
                ("position", entry.position_limit),
                ("velocity", entry.velocity_limit),
                ("acceleration", entry.acceleration_limit),
            ];
            for (kind, limit) in limits {
                let Some(limit) = limit else { continue };
                if limit.min.is_nan() || limit.max.is_nan() || limit.min >= limit.max {
                    return Err(format!(
                        "joint '{}': empty {kind} limit [{}, {})",
                        entry.name, limit.min, limit.max
                    ));
                }
            }
        }
        Ok(())
    }
}

pub fn load_rig_config(path: impl AsRef<Path>) -> anyhow::Result<RigConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading rig config: {}", path.display()))?;
    let config: RigConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing yaml: {}", path.display()))?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("validating rig config: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_built_in_constants() {
        let config = RigConfig::default();
        assert_eq!(config.model_name, MODEL_NAME);
        assert_eq!(config.joints.len(), JointId::COUNT);
        assert!(config.validate().is_ok());

        let hip = config.joint_or_default(JointId::Hip);
        assert_eq!(hip.gear_ratio_or_default(JointId::Hip), 9.0);
        assert!((hip.max_torque_or_default() - 0.45).abs() < 1e-12);
        let yaw = config.joint_or_default(JointId::PlanarizerYaw);
        assert_eq!(yaw.gear_ratio_or_default(JointId::PlanarizerYaw), 1.0);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
joints:
  - name: knee_joint
    reverse_polarity: true
    position_limit: { min: -1.2, max: 1.2 }
    velocity_limit: { max: 20.0 }
"#;
        let config: RigConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model_name, MODEL_NAME);

        let knee = config.joint_or_default(JointId::Knee);
        assert!(knee.reverse_polarity);
        assert_eq!(knee.gear_ratio_or_default(JointId::Knee), 9.0);
        assert_eq!(knee.position_limit, Some(Limit::new(-1.2, 1.2)));
        assert_eq!(
            knee.velocity_limit,
            Some(Limit::new(f64::NEG_INFINITY, 20.0))
        );
        assert!(config.joint(JointId::Hip).is_none());
    }

    #[test]
    fn validate_rejects_bad_entries() {
        let mut config = RigConfig::default();
        config.joints.push(JointConfig::defaults_for(JointId::Hip));
        assert!(config.validate().unwrap_err().contains("twice"));

        let mut config = RigConfig::default();
        config.joints[0].name = "ankle_joint".into();
        assert!(config.validate().unwrap_err().contains("unknown"));

        let mut config = RigConfig::default();
        config.joints[1].gear_ratio = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_limits() {
        let mut config = RigConfig::default();
        config.joints[0].position_limit = Some(Limit::new(0.5, -0.5));
        assert!(config.validate().unwrap_err().contains("position"));

        let mut config = RigConfig::default();
        config.joints[2].velocity_limit = Some(Limit::new(f64::NAN, 1.0));
        assert!(config.validate().unwrap_err().contains("velocity"));

        let mut config = RigConfig::default();
        config.joints[1].acceleration_limit = Some(Limit::new(2.0, 2.0));
        assert!(config.validate().is_err());

        let mut config = RigConfig::default();
        config.joints[1].velocity_limit = Some(Limit::new(f64::NEG_INFINITY, 20.0));
        assert!(config.validate().is_ok());
    }
}
