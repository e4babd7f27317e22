use monopod_sdk::{load_rig_config, JointId, Limit, MockBoard, Mode, Monopod, RigConfig};
use std::io::Write;

const RIG_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/monopod.yaml");

#[test]
fn shipped_rig_config_loads() {
    let config = load_rig_config(RIG_CONFIG).unwrap();
    assert_eq!(config.model_name, "open_sim2real_monopod");
    assert_eq!(config.joints.len(), JointId::COUNT);

    let knee = config.joint(JointId::Knee).unwrap();
    assert!(knee.reverse_polarity);
    assert_eq!(knee.position_limit, Some(Limit::new(-2.6, 2.6)));
    assert_eq!(config.joint(JointId::PlanarizerYaw).unwrap().position_limit, None);
}

#[test]
fn loaded_config_drives_the_registry() {
    let config = load_rig_config(RIG_CONFIG).unwrap();
    let board = MockBoard::new();
    let mut monopod = Monopod::with_config(config).unwrap();
    monopod.initialize(Mode::FullRig, &board).unwrap();

    assert_eq!(
        monopod.get_joint_position_limit(JointId::BoomConnector),
        Some(Limit::new(-0.35, 0.35))
    );
    // No entry configured, so the limit is unrestricted.
    assert_eq!(
        monopod.get_joint_velocity_limit(JointId::PlanarizerYaw),
        Some(Limit::UNRESTRICTED)
    );
}

#[test]
fn unknown_joint_name_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "joints:\n  - name: ankle_joint\n    gear_ratio: 3.0").unwrap();

    let err = load_rig_config(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("ankle_joint"));
}

#[test]
fn malformed_yaml_reports_the_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "joints: [name: hip_joint").unwrap();

    let err = load_rig_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("parsing yaml"));
}

#[test]
fn empty_file_yields_default_model() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "{}\n").unwrap();

    let config = load_rig_config(file.path()).unwrap();
    assert_eq!(config.model_name, RigConfig::default().model_name);
    assert!(config.joints.is_empty());
}
