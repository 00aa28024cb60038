//! axarm-scene - 运动学映射与渲染侧状态
//!
//! 把状态存储里相信的关节角变成屏幕上的连续姿态：
//!
//! - **kinematics**: 纯函数的角度→局部旋转映射（方向修正 + 机械零位偏移
//!   + 行程居中），确定性、无状态
//! - **smoother**: 每帧指数逼近目标旋转，把网络/轮询延迟与视觉连续性解耦
//! - **scene**: 固定的连杆链场景图，从插值后的姿态解算各关节世界坐标，
//!   任一关节落到参考平面以下时给出告警（仅提示，不拦截指令）
//!
//! 本 crate 不依赖状态存储，也绝不反向写入它——渲染侧只消费。

pub mod kinematics;
pub mod scene;
pub mod smoother;

pub use kinematics::{GRIPPER_APERTURE_SCALE, JointMapper, RANGE_CENTER_DEG, gripper_half_radians};
pub use scene::{ArmScene, JointWorldPositions};
pub use smoother::{ArmPose, PoseTargets, approach};
