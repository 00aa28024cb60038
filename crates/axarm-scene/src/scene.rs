//! 连杆链场景图与碰撞探针
//!
//! 臂体是固定拓扑的四节点链：底座绕 Y 轴偏航，肩、肘绕各自局部 Z 轴
//! 俯仰，夹爪安装点随前臂末端。逐级组合等距变换得到各关节的世界坐标，
//! 任一关节的世界 y 坐标落到参考平面（y = 0）以下即判定为触地告警。
//!
//! 告警只作提示，不拦截、不回滚任何指令。

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use crate::smoother::ArmPose;

/// 底座顶面到肩关节的高度
pub const SHOULDER_HEIGHT: f64 = 0.6;
/// 肩关节到肘关节的大臂长
pub const UPPER_ARM_LENGTH: f64 = 2.4;
/// 肘关节到夹爪安装点的前臂长
pub const FOREARM_LENGTH: f64 = 2.0;

/// 一帧解算出的各关节世界坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointWorldPositions {
    pub base: Point3<f64>,
    pub shoulder: Point3<f64>,
    pub elbow: Point3<f64>,
    pub gripper: Point3<f64>,
}

impl JointWorldPositions {
    /// 任一关节触及或穿越参考平面
    pub fn touches_ground(&self) -> bool {
        self.base.y < 0.0 || self.shoulder.y < 0.0 || self.elbow.y < 0.0 || self.gripper.y < 0.0
    }

    /// 最低关节的世界 y 坐标
    pub fn lowest_y(&self) -> f64 {
        self.base
            .y
            .min(self.shoulder.y)
            .min(self.elbow.y)
            .min(self.gripper.y)
    }
}

/// 固定连杆链的正运动学解算器
///
/// 无内部可变状态，每帧用当前渲染姿态重新解算。
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmScene;

impl ArmScene {
    pub fn new() -> Self {
        Self
    }

    /// 从渲染姿态解算各关节的世界坐标
    pub fn solve(&self, pose: &ArmPose) -> JointWorldPositions {
        let base_iso = Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), pose.base_rad),
        );
        let shoulder_iso = base_iso
            * Isometry3::from_parts(
                Translation3::new(0.0, SHOULDER_HEIGHT, 0.0),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), pose.shoulder_rad),
            );
        let elbow_iso = shoulder_iso
            * Isometry3::from_parts(
                Translation3::new(0.0, UPPER_ARM_LENGTH, 0.0),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), pose.elbow_rad),
            );
        let gripper_iso = elbow_iso * Translation3::new(0.0, FOREARM_LENGTH, 0.0);

        JointWorldPositions {
            base: Point3::origin(),
            shoulder: shoulder_iso.translation.vector.into(),
            elbow: elbow_iso.translation.vector.into(),
            gripper: gripper_iso.translation.vector.into(),
        }
    }

    /// 便捷探针：当前姿态是否触地
    pub fn probe(&self, pose: &ArmPose) -> bool {
        self.solve(pose).touches_ground()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn neutral_pose() -> ArmPose {
        ArmPose::new(0.1)
    }

    #[test]
    fn test_neutral_pose_stands_upright() {
        let scene = ArmScene::new();
        let pos = scene.solve(&neutral_pose());
        assert!((pos.shoulder.y - 0.6).abs() < 1e-12);
        assert!((pos.elbow.y - 3.0).abs() < 1e-12);
        assert!((pos.gripper.y - 5.0).abs() < 1e-12);
        assert!(!pos.touches_ground());
    }

    #[test]
    fn test_base_yaw_does_not_change_heights() {
        let scene = ArmScene::new();
        let mut pose = neutral_pose();
        pose.base_rad = 1.3;
        let pos = scene.solve(&pose);
        assert!((pos.elbow.y - 3.0).abs() < 1e-12);
        assert!((pos.gripper.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_shoulder_folded_back_drives_elbow_underground() {
        let scene = ArmScene::new();
        let mut pose = neutral_pose();
        pose.shoulder_rad = PI; // 大臂竖直向下
        let pos = scene.solve(&pose);
        assert!((pos.elbow.y - (-1.8)).abs() < 1e-9);
        assert!(pos.touches_ground());
        assert!(scene.probe(&pose));
    }

    #[test]
    fn test_horizontal_reach_stays_above_ground() {
        let scene = ArmScene::new();
        let mut pose = neutral_pose();
        pose.shoulder_rad = FRAC_PI_2; // 大臂水平
        pose.elbow_rad = -FRAC_PI_2; // 前臂折回竖直
        let pos = scene.solve(&pose);
        assert!((pos.elbow.y - 0.6).abs() < 1e-9);
        assert!((pos.gripper.y - 2.6).abs() < 1e-9);
        assert!(!pos.touches_ground());
    }

    #[test]
    fn test_lowest_y_reports_deepest_joint() {
        let scene = ArmScene::new();
        let mut pose = neutral_pose();
        pose.shoulder_rad = PI;
        let pos = scene.solve(&pose);
        assert!((pos.lowest_y() - (-3.8)).abs() < 1e-9);
    }
}
