//! 运动学映射
//!
//! 单关节的角度读数 → 场景节点局部旋转：
//!
//! ```text
//! rendered_rad = to_radians(((raw_deg − offset_deg) − 150°) × direction)
//! ```
//!
//! 150° 是 0–300° 行程的居中常数，把舵机行程中点对齐到中立姿态。
//! 这里不做任何范围截断——截断是指令分发器在下发前的职责。
//! 函数是纯的：相同输入永远得到位级相同的输出。

/// 0–300° 行程的居中常数（度）
pub const RANGE_CENTER_DEG: f64 = 150.0;

/// 夹爪开度 → 单侧半开角的缩放系数
pub const GRIPPER_APERTURE_SCALE: f64 = 0.45;

/// 角度读数映射为局部旋转（弧度）
///
/// `direction` 取 +1/−1，`offset_deg` 为该关节的机械零位偏移。
pub fn target_radians(raw_deg: f64, direction: f64, offset_deg: f64) -> f64 {
    (((raw_deg - offset_deg) - RANGE_CENTER_DEG) * direction).to_radians()
}

/// 夹爪开度（度）→ 单侧半开角（弧度）
///
/// 两个爪指从同一个开度值取对称相反的角度。
pub fn gripper_half_radians(openness_deg: f64) -> f64 {
    (openness_deg * GRIPPER_APERTURE_SCALE).to_radians()
}

/// 绑定了单关节机械参数的映射器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMapper {
    pub direction: f64,
    pub offset_deg: f64,
}

impl JointMapper {
    pub fn new(direction: f64, offset_deg: f64) -> Self {
        Self {
            direction,
            offset_deg,
        }
    }

    pub fn target_radians(&self, raw_deg: f64) -> f64 {
        target_radians(raw_deg, self.direction, self.offset_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_mapper_is_deterministic() {
        // 相同输入 → 位级相同输出
        let a = target_radians(123.456, -1.0, -86.0);
        let b = target_radians(123.456, -1.0, -86.0);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_known_deployment_values() {
        // base: ((80 − 20) − 150) × +1 = −90°
        let base = target_radians(80.0, 1.0, 20.0);
        assert!((base - (-FRAC_PI_2)).abs() < 1e-12);

        // shoulder 预设 64°: ((64 − (−86)) − 150) × −1 = 0 → 中立姿态
        let shoulder = target_radians(64.0, -1.0, -86.0);
        assert_eq!(shoulder, 0.0);

        // elbow: ((64 − 5) − 150) × −1 = +91°
        let elbow = target_radians(64.0, -1.0, 5.0);
        assert!((elbow - 91.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_direction_flips_sign() {
        let cw = target_radians(200.0, 1.0, 0.0);
        let ccw = target_radians(200.0, -1.0, 0.0);
        assert_eq!(cw, -ccw);
    }

    #[test]
    fn test_no_clamping_outside_nominal_range() {
        // 超出 0–300° 的读数照常映射，截断不是这里的职责
        let over = target_radians(400.0, 1.0, 0.0);
        assert!((over - 250.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_gripper_half_angle() {
        let half = gripper_half_radians(120.0);
        assert!((half - 54.0_f64.to_radians()).abs() < 1e-12);
        assert_eq!(gripper_half_radians(0.0), 0.0);
    }
}
