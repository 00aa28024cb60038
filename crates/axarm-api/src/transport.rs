//! 传输抽象
//!
//! [`ArmTransport`] 是控制台与远端之间唯一的缝。上层持有
//! `Arc<dyn ArmTransport>`，生产环境注入 [`crate::HttpTransport`]，
//! 测试注入 `MockTransport`（feature `mock`）。
//!
//! 所有方法都是阻塞调用：它们只会在分发器的工作线程或同步循环线程
//! 里执行，调用发起方永远不等待往返。

use crate::error::ApiError;
use crate::types::*;

/// 远程指令/遥测接口
///
/// 对象安全；实现必须 `Send + Sync`（会被多个后台线程共享）。
pub trait ArmTransport: Send + Sync {
    /// 移动一个舵机到目标角度（度，0–300）
    ///
    /// 后端在写入目标位置前会自动重新使能扭矩。
    fn move_joint(&self, servo: ServoId, angle_deg: f64) -> Result<MoveResponse, ApiError>;

    /// 急停：广播关闭所有舵机扭矩
    fn stop(&self) -> Result<AckResponse, ApiError>;

    /// 解除急停：广播重新使能扭矩
    fn resume(&self) -> Result<AckResponse, ApiError>;

    /// 回到预设位姿
    fn reset(&self) -> Result<AckResponse, ApiError>;

    /// 单舵机扭矩开关
    fn torque(&self, servo: ServoId, enable: bool) -> Result<TorqueResponse, ApiError>;

    /// 读取单个舵机的完整遥测
    fn inspect(&self, servo: ServoId) -> Result<InspectData, ApiError>;

    /// 批量遥测：逐个舵机独立失败
    ///
    /// 一个舵机读取失败不影响其他舵机的结果，这是同步循环
    /// 容忍部分失败的基础。默认实现顺序调用 [`Self::inspect`]。
    fn inspect_all(&self, servos: &[ServoId]) -> Vec<(ServoId, Result<InspectData, ApiError>)> {
        servos.iter().map(|&id| (id, self.inspect(id))).collect()
    }

    /// 后端存活探针
    fn status(&self) -> Result<StatusResponse, ApiError>;
}
