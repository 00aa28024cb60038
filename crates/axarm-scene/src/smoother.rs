//! 运动平滑器
//!
//! 每个渲染 tick 把显示旋转向目标旋转逼近剩余距离的固定比例 k。
//! 这是指数平滑而非时间归一化插值：帧率波动改变收敛速度，
//! 不影响正确性——k ∈ (0, 1] 时单调收敛、永不过冲。
//! 只改渲染侧状态，绝不写状态存储。

/// 一步指数逼近：`current + (target − current) × k`
pub fn approach(current: f64, target: f64, k: f64) -> f64 {
    current + (target - current) * k
}

/// 一帧的目标旋转集合（由映射器从最新关节角算出）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseTargets {
    pub base_rad: f64,
    pub shoulder_rad: f64,
    pub elbow_rad: f64,
    /// 夹爪单侧半开角；两爪指取 ± 对称值
    pub gripper_half_rad: f64,
}

/// 渲染侧姿态（当前显示的旋转）
#[derive(Debug, Clone, PartialEq)]
pub struct ArmPose {
    pub base_rad: f64,
    pub shoulder_rad: f64,
    pub elbow_rad: f64,
    pub gripper_left_rad: f64,
    pub gripper_right_rad: f64,
    k: f64,
}

impl ArmPose {
    /// `k` 为插值系数，调用方保证 k ∈ (0, 1]
    pub fn new(k: f64) -> Self {
        debug_assert!(k > 0.0 && k <= 1.0);
        Self {
            base_rad: 0.0,
            shoulder_rad: 0.0,
            elbow_rad: 0.0,
            gripper_left_rad: 0.0,
            gripper_right_rad: 0.0,
            k,
        }
    }

    /// 无平滑直跳（会话开始时对齐初始姿态用）
    pub fn snap_to(&mut self, targets: &PoseTargets) {
        self.base_rad = targets.base_rad;
        self.shoulder_rad = targets.shoulder_rad;
        self.elbow_rad = targets.elbow_rad;
        self.gripper_left_rad = targets.gripper_half_rad;
        self.gripper_right_rad = -targets.gripper_half_rad;
    }

    /// 前进一个渲染 tick
    pub fn tick(&mut self, targets: &PoseTargets) {
        self.base_rad = approach(self.base_rad, targets.base_rad, self.k);
        self.shoulder_rad = approach(self.shoulder_rad, targets.shoulder_rad, self.k);
        self.elbow_rad = approach(self.elbow_rad, targets.elbow_rad, self.k);
        self.gripper_left_rad = approach(self.gripper_left_rad, targets.gripper_half_rad, self.k);
        self.gripper_right_rad =
            approach(self.gripper_right_rad, -targets.gripper_half_rad, self.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_non_increasing_and_converges() {
        let mut pose = ArmPose::new(0.1);
        let targets = PoseTargets {
            base_rad: 1.0,
            ..Default::default()
        };
        let mut prev = (pose.base_rad - targets.base_rad).abs();
        for _ in 0..200 {
            pose.tick(&targets);
            let dist = (pose.base_rad - targets.base_rad).abs();
            assert!(dist <= prev, "distance increased");
            prev = dist;
        }
        assert!(prev < 1e-8);
    }

    #[test]
    fn test_never_overshoots() {
        let mut pose = ArmPose::new(1.0); // k=1 边界：一步到位，不越过
        let targets = PoseTargets {
            elbow_rad: -0.5,
            ..Default::default()
        };
        pose.tick(&targets);
        assert_eq!(pose.elbow_rad, -0.5);
        pose.tick(&targets);
        assert_eq!(pose.elbow_rad, -0.5);
    }

    #[test]
    fn test_gripper_halves_are_symmetric() {
        let mut pose = ArmPose::new(0.2);
        let targets = PoseTargets {
            gripper_half_rad: 0.9,
            ..Default::default()
        };
        for _ in 0..50 {
            pose.tick(&targets);
            assert!((pose.gripper_left_rad + pose.gripper_right_rad).abs() < 1e-12);
        }
        assert!((pose.gripper_left_rad - 0.9).abs() < 1e-4);
    }

    #[test]
    fn test_snap_to_aligns_immediately() {
        let mut pose = ArmPose::new(0.1);
        let targets = PoseTargets {
            base_rad: -1.2,
            shoulder_rad: 0.3,
            elbow_rad: 0.7,
            gripper_half_rad: 0.4,
        };
        pose.snap_to(&targets);
        assert_eq!(pose.base_rad, -1.2);
        assert_eq!(pose.gripper_right_rad, -0.4);
    }
}
