//! 事件类型定义
//!
//! 后台线程（指令工作线程、同步循环）与状态变更泵之间的唯一载体。
//! 所有事件都在 [`crate::Dispatcher::process_events`] 里被串行应用。

use axarm_api::{ApiError, InspectData, ServoId};

use crate::config::JointId;

/// 异步送达的结算/遥测事件
#[derive(Debug)]
pub enum ArmEvent {
    /// 一次 move 往返结算
    MoveSettled {
        joint: JointId,
        servo: ServoId,
        /// 分发时的 pending 日志序号
        seq: u64,
        result: Result<(), ApiError>,
    },

    /// 急停调用结算（急停日志条目在分发时已是终局，
    /// 这里只在远程调用失败时补一条 failed 记录）
    StopSettled { result: Result<(), ApiError> },

    /// resume 往返结算
    ResumeSettled {
        seq: u64,
        result: Result<(), ApiError>,
    },

    /// reset 往返结算
    ResetSettled {
        seq: u64,
        result: Result<(), ApiError>,
    },

    /// 扭矩开关往返结算（携带补偿回滚所需的先前值与写代数）
    TorqueSettled {
        servo: ServoId,
        generation: u64,
        prior: bool,
        seq: u64,
        result: Result<(), ApiError>,
    },

    /// 一轮遥测，逐舵机独立成败
    Telemetry {
        results: Vec<(ServoId, Result<InspectData, ApiError>)>,
    },
}
