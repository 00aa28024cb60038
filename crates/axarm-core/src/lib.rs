//! axarm-core - 状态同步引擎
//!
//! 控制台的核心：把本地"相信的"机械臂状态与周期轮询的远端真值
//! 保持一致，并把所有用户意图串行化为可审计的指令历史。
//!
//! # 架构
//!
//! ```text
//! 用户意图 ──> Dispatcher ──┬─> StateStore 乐观写入 + CommandLog(pending)
//!                           └─> 工作线程执行远程调用
//!                                      │
//!                「结算事件」<──────────┘
//!                      │
//! SyncLoop ──「遥测事件」┤
//!                      v
//!            process_events()  ←── 唯一的状态变更泵（单写者）
//! ```
//!
//! - **StateStore** (`state`): 相信的关节角/舵机遥测/臂状态的唯一持有者
//! - **CommandLog** (`log`): 只追加、序号严格递增的指令历史
//! - **Dispatcher** (`dispatcher`): 意图 → 乐观写入 + 远程调用 + 结算对账
//! - **SyncLoop** (`sync`): 固定间隔的遥测轮询，容忍逐舵机的部分失败
//! - **LinkMonitor** (`link`): 基于单调时钟的连接活性判定
//! - **ArmConfig** (`config`): 关节→舵机静态映射与部署参数
//!
//! # 并发模型
//!
//! 调用方线程只做乐观写入并入队远程调用；一个工作线程顺序执行
//! 往返并产生结算事件；同步循环线程产生遥测事件。两类事件都只在
//! [`Dispatcher::process_events`] 里被应用——状态变更经由单一泵
//! 串行化，后发的本地写入通过逐字段写代数压制迟到的旧结算。

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod link;
pub mod log;
pub mod state;
pub mod sync;

pub use config::{ArmConfig, ConfigError, JointConfig, JointId};
pub use dispatcher::Dispatcher;
pub use error::CommandError;
pub use event::ArmEvent;
pub use log::{CommandLogEntry, CommandOutcome};
pub use state::{ArmStatus, JointAngles, ServoTelemetry, StateStore};
pub use sync::SyncLoop;

// 对外重导出接口契约，调用方无需直接依赖 axarm-api
pub use axarm_api::{ApiError, ArmTransport, ServoId};
