//! 指令分发器
//!
//! 把用户意图翻译成远程调用，同时维护乐观的本地状态：
//!
//! 1. **阶段一（同步）**: 校验 → 乐观写入状态存储 → 追加 pending 日志
//!    → 调用入队。调用方永不等待往返。
//! 2. **阶段二（异步结算）**: 工作线程顺序执行远程调用并回送结算事件；
//!    [`Dispatcher::process_events`] 把结算应用回状态存储与日志——
//!    成功提交、失败补偿（仅限可无歧义回滚的字段）或保留并记账。
//!
//! 所有失败都在这一层被捕获并转化为 `failed` 日志条目，
//! 不允许任何错误穿透进渲染循环。

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use axarm_api::{ArmTransport, ServoId};
use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{info, trace, warn};

use crate::config::{ArmConfig, JointId};
use crate::error::CommandError;
use crate::event::ArmEvent;
use crate::log::CommandOutcome;
use crate::state::StateStore;

/// 入队给工作线程的远程调用
enum RemoteCall {
    Move {
        joint: JointId,
        servo: ServoId,
        angle_deg: f64,
        seq: u64,
    },
    Stop,
    Resume {
        seq: u64,
    },
    Reset {
        seq: u64,
    },
    Torque {
        servo: ServoId,
        enable: bool,
        prior: bool,
        generation: u64,
        seq: u64,
    },
}

/// 指令分发器
///
/// 拥有工作线程与事件通道；`drop` 时关闭调用通道并等待工作线程退出。
pub struct Dispatcher {
    store: Arc<StateStore>,
    config: Arc<ArmConfig>,
    calls: Option<Sender<RemoteCall>>,
    events_tx: Sender<ArmEvent>,
    events_rx: Receiver<ArmEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<StateStore>,
        transport: Arc<dyn ArmTransport>,
        config: Arc<ArmConfig>,
    ) -> Self {
        let (calls_tx, calls_rx) = unbounded::<RemoteCall>();
        let (events_tx, events_rx) = unbounded::<ArmEvent>();

        let worker = {
            let events = events_tx.clone();
            thread::spawn(move || worker_loop(transport, calls_rx, events))
        };

        Self {
            store,
            config,
            calls: Some(calls_tx),
            events_tx,
            events_rx,
            worker: Some(worker),
        }
    }

    /// 事件发送端（交给同步循环投递遥测事件）
    pub fn events_sender(&self) -> Sender<ArmEvent> {
        self.events_tx.clone()
    }

    /// 状态存储（只读消费者使用）
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    // ==================== 用户意图 ====================

    /// 移动一个关节到目标角度
    ///
    /// 急停闭锁期间在任何写入之前拒绝；角度超范围同样先拒绝。
    /// 返回本次意图的日志序号。
    pub fn move_joint(&self, joint: JointId, angle_deg: f64) -> Result<u64, CommandError> {
        if self.store.emergency() {
            return Err(CommandError::EmergencyActive);
        }
        let jc = self.config.joint(joint);
        if !(jc.min_deg..=jc.max_deg).contains(&angle_deg) {
            return Err(CommandError::AngleOutOfRange {
                joint,
                angle_deg,
                min_deg: jc.min_deg,
                max_deg: jc.max_deg,
            });
        }
        let servo = jc.servo;

        // 阶段一：乐观写入 + pending 日志，UI 不阻塞
        self.store.set_joint_angle(joint, angle_deg);
        self.store.write_goal(servo, angle_deg);
        self.store.begin_command();
        let seq = self.store.append_log(
            format!("Move {joint} to {angle_deg:.0}°"),
            CommandOutcome::Pending,
        );

        self.enqueue(
            RemoteCall::Move {
                joint,
                servo,
                angle_deg,
                seq,
            },
            seq,
        )?;
        Ok(seq)
    }

    /// 急停
    ///
    /// 本地安全状态的变更不以网络成功为条件：急停位与在途清零
    /// 同步生效，日志条目立即以 `emergency` 终局追加（它记录的是
    /// 用户意图这一事实，不是对结果的预测）。
    pub fn emergency_stop(&self) -> u64 {
        self.store.trip_emergency();
        let seq = self
            .store
            .append_log("EMERGENCY STOP".to_string(), CommandOutcome::Emergency);
        info!("emergency stop latched");

        if self.send(RemoteCall::Stop).is_err() {
            // 本地闭锁已生效；远程未能送出只能记账
            self.store.append_log(
                "Emergency stop call not sent: worker unavailable".to_string(),
                CommandOutcome::Failed,
            );
        }
        seq
    }

    /// 解除急停
    pub fn resume(&self) -> Result<u64, CommandError> {
        self.store.clear_emergency();
        let seq = self
            .store
            .append_log("Resume system".to_string(), CommandOutcome::Pending);
        self.enqueue(RemoteCall::Resume { seq }, seq)?;
        Ok(seq)
    }

    /// 回预设位姿（同时解除急停）
    pub fn reset(&self) -> Result<u64, CommandError> {
        self.store.clear_emergency();
        for (&joint, jc) in &self.config.joints {
            self.store.set_joint_angle(joint, jc.preset_deg);
            self.store.write_goal(jc.servo, jc.preset_deg);
        }
        self.store.begin_command();
        let seq = self.store.append_log(
            format!("Preset {}", self.config.preset_label()),
            CommandOutcome::Pending,
        );
        self.enqueue(RemoteCall::Reset { seq }, seq)?;
        Ok(seq)
    }

    /// 单舵机扭矩开关——规范的"乐观写入 + 补偿回滚"操作
    pub fn set_torque(&self, servo: ServoId, enable: bool) -> Result<u64, CommandError> {
        let (prior, generation) = self
            .store
            .write_torque(servo, enable)
            .ok_or(CommandError::UnknownServo(servo))?;
        self.store.begin_command();
        let seq = self.store.append_log(
            format!("Torque {servo} {}", if enable { "on" } else { "off" }),
            CommandOutcome::Pending,
        );
        self.enqueue(
            RemoteCall::Torque {
                servo,
                enable,
                prior,
                generation,
                seq,
            },
            seq,
        )?;
        Ok(seq)
    }

    /// 扭矩限制——观测契约中没有对应远程调用的本地写入
    ///
    /// 若后端将来提供限制端点，这里必须改成与 `set_torque`
    /// 相同的 pending 往返。
    pub fn set_torque_limit(&self, servo: ServoId, limit_percent: f64) -> Result<u64, CommandError> {
        if !(0.0..=100.0).contains(&limit_percent) {
            return Err(CommandError::TorqueLimitOutOfRange(limit_percent));
        }
        self.store
            .set_torque_limit(servo, limit_percent)
            .ok_or(CommandError::UnknownServo(servo))?;
        Ok(self.store.append_log(
            format!("Torque limit {servo} to {limit_percent:.0}%"),
            CommandOutcome::Completed,
        ))
    }

    // ==================== 事件泵 ====================

    /// 应用所有已送达的结算/遥测事件，返回处理条数
    ///
    /// 这是状态存储唯一的异步变更入口，由宿主的 tick 循环调用。
    pub fn process_events(&self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            handled += 1;
        }
        handled
    }

    fn apply(&self, event: ArmEvent) {
        match event {
            ArmEvent::MoveSettled {
                joint,
                servo,
                seq,
                result,
            } => {
                self.store.end_command();
                match result {
                    Ok(()) => self.store.settle_log(seq, CommandOutcome::Completed),
                    Err(err) => {
                        // 失败的 move 不回滚乐观角度：臂的真实位置未知，
                        // 不存在无歧义的回滚目标；下一轮遥测会刷新 present
                        warn!(%joint, %servo, %err, "move failed; keeping optimistic angle");
                        self.store.settle_log(seq, CommandOutcome::Failed);
                    }
                }
            }

            ArmEvent::StopSettled { result } => {
                if let Err(err) = result {
                    warn!(%err, "emergency stop call failed (local latch already in effect)");
                    self.store.append_log(
                        format!("Emergency stop call failed: {err}"),
                        CommandOutcome::Failed,
                    );
                }
            }

            ArmEvent::ResumeSettled { seq, result } => match result {
                Ok(()) => self.store.settle_log(seq, CommandOutcome::Completed),
                Err(err) => {
                    warn!(%err, "resume failed");
                    self.store.settle_log(seq, CommandOutcome::Failed);
                }
            },

            ArmEvent::ResetSettled { seq, result } => {
                self.store.end_command();
                match result {
                    Ok(()) => self.store.settle_log(seq, CommandOutcome::Completed),
                    Err(err) => {
                        warn!(%err, "reset failed; keeping optimistic preset pose");
                        self.store.settle_log(seq, CommandOutcome::Failed);
                    }
                }
            }

            ArmEvent::TorqueSettled {
                servo,
                generation,
                prior,
                seq,
                result,
            } => {
                self.store.end_command();
                match result {
                    Ok(()) => {
                        self.store.settle_torque(servo, generation, prior, true);
                        self.store.settle_log(seq, CommandOutcome::Completed);
                    }
                    Err(err) => {
                        // 补偿回滚：仅当没有更新的本地写入压制本次代数
                        warn!(%servo, %err, "torque toggle failed; reverting");
                        self.store.settle_torque(servo, generation, prior, false);
                        self.store.settle_log(seq, CommandOutcome::Failed);
                    }
                }
            }

            ArmEvent::Telemetry { results } => {
                let mut any_ok = false;
                for (servo, result) in results {
                    match result {
                        Ok(data) => {
                            self.store.apply_telemetry(servo, &data);
                            any_ok = true;
                        }
                        Err(err) => {
                            // 部分失败：该舵机保留旧值，其余照常应用
                            warn!(%servo, %err, "telemetry fetch failed; keeping stale values");
                        }
                    }
                }
                if any_ok {
                    self.store.mark_telemetry_seen();
                }
            }
        }
    }

    // ==================== 内部 ====================

    fn send(&self, call: RemoteCall) -> Result<(), CommandError> {
        self.calls
            .as_ref()
            .ok_or(CommandError::ChannelClosed)?
            .send(call)
            .map_err(|_| CommandError::ChannelClosed)
    }

    /// 入队；通道已关时就地结算为 failed 并撤销在途计数
    fn enqueue(&self, call: RemoteCall, seq: u64) -> Result<(), CommandError> {
        if let Err(err) = self.send(call) {
            self.store.end_command();
            self.store.settle_log(seq, CommandOutcome::Failed);
            return Err(err);
        }
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // 先关调用通道，工作线程随即退出
        self.calls.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// 工作线程：顺序执行远程调用并回送结算事件
///
/// 单工作线程即同字段调用的 FIFO 保证；事件通道关闭（宿主拆除）
/// 时直接退出，不再触碰任何状态。
fn worker_loop(
    transport: Arc<dyn ArmTransport>,
    calls: Receiver<RemoteCall>,
    events: Sender<ArmEvent>,
) {
    for call in calls.iter() {
        let event = match call {
            RemoteCall::Move {
                joint,
                servo,
                angle_deg,
                seq,
            } => ArmEvent::MoveSettled {
                joint,
                servo,
                seq,
                result: transport.move_joint(servo, angle_deg).map(drop),
            },
            RemoteCall::Stop => ArmEvent::StopSettled {
                result: transport.stop().map(drop),
            },
            RemoteCall::Resume { seq } => ArmEvent::ResumeSettled {
                seq,
                result: transport.resume().map(drop),
            },
            RemoteCall::Reset { seq } => ArmEvent::ResetSettled {
                seq,
                result: transport.reset().map(drop),
            },
            RemoteCall::Torque {
                servo,
                enable,
                prior,
                generation,
                seq,
            } => ArmEvent::TorqueSettled {
                servo,
                generation,
                prior,
                seq,
                result: transport.torque(servo, enable).map(drop),
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }
    trace!("command worker exited");
}
