use monopod_sdk::{
    Encoder, EncoderModule, JointId, Limit, MeasurementKind, MockBoard, Motor, MotorModule,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn angle_follows_polarity_gear_and_zero(
        raw in -100.0..100.0f64,
        gear_ratio in 0.1..50.0f64,
        zero_angle in -3.2..3.2f64,
        reverse in any::<bool>(),
    ) {
        let board = MockBoard::new();
        let encoder = EncoderModule::new(
            JointId::Hip,
            Encoder::new(&board, JointId::Hip),
            gear_ratio,
            zero_angle,
            reverse,
        );
        board.push(JointId::Hip, MeasurementKind::Position, raw);

        let polarity = if reverse { -1.0 } else { 1.0 };
        let expected = polarity * raw / gear_ratio - zero_angle;
        prop_assert!((encoder.get_measured_angle() - expected).abs() < 1e-9);

        encoder.set_zero_angle(polarity * raw / gear_ratio);
        prop_assert!(encoder.get_measured_angle().abs() < 1e-9);
    }

    #[test]
    fn torque_target_never_exceeds_max(
        requested in -1e6..1e6f64,
        max_torque in 0.0..10.0f64,
    ) {
        let board = MockBoard::new();
        let motor = MotorModule::new(
            JointId::Knee,
            Motor::new(&board, JointId::Knee),
            9.0,
            0.0,
            false,
            max_torque,
        );
        motor.set_torque_target(requested);

        let stored = motor.get_torque_target();
        prop_assert!(stored.abs() <= max_torque);
        if requested.abs() > max_torque {
            prop_assert_eq!(stored, max_torque.copysign(requested));
        } else {
            prop_assert_eq!(stored, requested);
        }
    }

    #[test]
    fn limit_round_trips_exactly(min in -1e3..0.0f64, max in 0.0..1e3f64) {
        let board = MockBoard::new();
        let encoder = EncoderModule::new(
            JointId::PlanarizerYaw,
            Encoder::new(&board, JointId::PlanarizerYaw),
            1.0,
            0.0,
            false,
        );
        for kind in [
            MeasurementKind::Position,
            MeasurementKind::Velocity,
            MeasurementKind::Acceleration,
        ] {
            encoder.set_limit(kind, Limit::new(min, max));
            prop_assert_eq!(encoder.get_limit(kind), Limit::new(min, max));
        }
    }
}
