//! axarm-api - 远程指令/遥测接口契约
//!
//! 机械臂本体的运动执行、舵机固件与总线通信都不在控制台内部实现，
//! 它们通过一个远程 HTTP 服务暴露（`move` / `stop` / `resume` / `reset` /
//! `torque` / `inspect` / `status`）。本 crate 只定义该接口的调用契约：
//!
//! - **线上类型** (`types`): 与后端 JSON 字段一一对应的 DTO
//! - **传输抽象** (`transport`): 对象安全的 [`ArmTransport`] trait，
//!   上层（状态存储/指令分发）只依赖此 trait，不依赖具体实现
//! - **HTTP 实现** (`http`): 阻塞式 reqwest 客户端
//! - **Mock 实现** (`mock`, feature `mock`): 可编程的测试替身
//!
//! # Feature Flags
//!
//! - `mock`: 启用 [`mock::MockTransport`]（仅用于测试和离线演示）

pub mod error;
pub mod http;
pub mod transport;
pub mod types;

#[cfg(feature = "mock")]
pub mod mock;

pub use error::ApiError;
pub use http::HttpTransport;
pub use transport::ArmTransport;
pub use types::{
    AckResponse, InspectData, MoveResponse, ServoId, StatusResponse, TorqueResponse,
    parse_load_percent,
};
