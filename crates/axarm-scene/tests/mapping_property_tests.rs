//! 映射与平滑的属性测试
//!
//! 使用 proptest 验证数学属性。

use axarm_scene::kinematics::{gripper_half_radians, target_radians};
use axarm_scene::smoother::approach;
use axarm_scene::{ArmPose, ArmScene, PoseTargets};
use proptest::prelude::*;

proptest! {
    /// 相同输入永远得到位级相同的输出
    #[test]
    fn mapping_is_deterministic(raw in 0.0..300.0f64, offset in -120.0..120.0f64, flip in any::<bool>()) {
        let dir = if flip { -1.0 } else { 1.0 };
        let a = target_radians(raw, dir, offset);
        let b = target_radians(raw, dir, offset);
        prop_assert_eq!(a.to_bits(), b.to_bits());
    }

    /// 方向取反严格翻转符号
    #[test]
    fn direction_flips_sign(raw in 0.0..300.0f64, offset in -120.0..120.0f64) {
        let cw = target_radians(raw, 1.0, offset);
        let ccw = target_radians(raw, -1.0, offset);
        prop_assert_eq!(cw, -ccw);
    }

    /// 读数单调 → 旋转单调（方向为正时同向）
    #[test]
    fn mapping_is_monotonic(raw in 0.0..299.0f64, delta in 0.001..1.0f64, offset in -120.0..120.0f64) {
        let lo = target_radians(raw, 1.0, offset);
        let hi = target_radians(raw + delta, 1.0, offset);
        prop_assert!(hi > lo);
    }

    /// 夹爪半开角与开度成正比
    #[test]
    fn gripper_scaling_is_linear(openness in 0.0..300.0f64, scale in 0.1..3.0f64) {
        let base = gripper_half_radians(openness);
        let scaled = gripper_half_radians(openness * scale);
        prop_assert!((scaled - base * scale).abs() < 1e-9);
    }

    /// 一步逼近后的剩余距离严格按 (1 − k) 收缩
    #[test]
    fn approach_contracts_distance(current in -10.0..10.0f64, target in -10.0..10.0f64, k in 0.01..1.0f64) {
        let next = approach(current, target, k);
        let before = (target - current).abs();
        let after = (target - next).abs();
        prop_assert!((after - before * (1.0 - k)).abs() < 1e-9);
    }

    /// 任意 k ∈ (0, 1] 都不过冲：逼近结果停在 current 与 target 之间
    #[test]
    fn approach_never_overshoots(current in -10.0..10.0f64, target in -10.0..10.0f64, k in 0.01..=1.0f64) {
        let next = approach(current, target, k);
        let lo = current.min(target) - 1e-12;
        let hi = current.max(target) + 1e-12;
        prop_assert!(next >= lo && next <= hi);
    }

    /// 多帧 tick 后姿态收敛到目标
    #[test]
    fn pose_converges_to_targets(
        base in -3.0..3.0f64,
        shoulder in -3.0..3.0f64,
        elbow in -3.0..3.0f64,
        half in 0.0..1.0f64,
        k in 0.05..1.0f64,
    ) {
        let targets = PoseTargets {
            base_rad: base,
            shoulder_rad: shoulder,
            elbow_rad: elbow,
            gripper_half_rad: half,
        };
        let mut pose = ArmPose::new(k);
        for _ in 0..500 {
            pose.tick(&targets);
        }
        prop_assert!((pose.base_rad - base).abs() < 1e-6);
        prop_assert!((pose.shoulder_rad - shoulder).abs() < 1e-6);
        prop_assert!((pose.elbow_rad - elbow).abs() < 1e-6);
        prop_assert!((pose.gripper_left_rad - half).abs() < 1e-6);
        prop_assert!((pose.gripper_right_rad + half).abs() < 1e-6);
    }

    /// 底座偏航不改变任何关节的世界高度
    #[test]
    fn base_yaw_preserves_heights(yaw in -6.0..6.0f64, shoulder in -3.0..3.0f64, elbow in -3.0..3.0f64) {
        let scene = ArmScene::new();
        let mut a = ArmPose::new(0.1);
        a.shoulder_rad = shoulder;
        a.elbow_rad = elbow;
        let mut b = a.clone();
        b.base_rad = yaw;
        let pa = scene.solve(&a);
        let pb = scene.solve(&b);
        prop_assert!((pa.shoulder.y - pb.shoulder.y).abs() < 1e-9);
        prop_assert!((pa.elbow.y - pb.elbow.y).abs() < 1e-9);
        prop_assert!((pa.gripper.y - pb.gripper.y).abs() < 1e-9);
    }

    /// 连杆长度在任意姿态下守恒
    #[test]
    fn link_lengths_are_invariant(base in -6.0..6.0f64, shoulder in -3.0..3.0f64, elbow in -3.0..3.0f64) {
        let scene = ArmScene::new();
        let mut pose = ArmPose::new(0.1);
        pose.base_rad = base;
        pose.shoulder_rad = shoulder;
        pose.elbow_rad = elbow;
        let pos = scene.solve(&pose);
        let upper = (pos.elbow - pos.shoulder).norm();
        let fore = (pos.gripper - pos.elbow).norm();
        prop_assert!((upper - 2.4).abs() < 1e-9);
        prop_assert!((fore - 2.0).abs() < 1e-9);
    }
}
