//! MockTransport - 可编程的测试替身
//!
//! 用于集成测试和离线演示：
//!
//! - 逐操作的失败开关（`fail_move` / `fail_torque` / …）
//! - 逐舵机的遥测表与失败注入（部分失败场景）
//! - 完整的调用记录（断言端到端映射，如 shoulder → `move(2, 120)`）
//! - 可选的"闸门"：挡住下一次指令调用，让测试在结算前断言乐观状态

use std::collections::{BTreeMap, BTreeSet};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::error::ApiError;
use crate::transport::ArmTransport;
use crate::types::*;

/// 一次被记录的远程调用
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Move { servo: ServoId, angle_deg: f64 },
    Stop,
    Resume,
    Reset,
    Torque { servo: ServoId, enable: bool },
    Inspect(ServoId),
    Status,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    fail_move: bool,
    fail_stop: bool,
    fail_resume: bool,
    fail_reset: bool,
    fail_torque: bool,
    telemetry: BTreeMap<ServoId, InspectData>,
    failing_servos: BTreeSet<ServoId>,
    gate: Option<Receiver<()>>,
}

/// 可编程 Mock 传输
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构造一份形状合理的遥测样本
    pub fn sample_inspect(servo: ServoId, position_deg: f64) -> InspectData {
        InspectData {
            servo_id: servo.0,
            position_deg,
            position_raw: (position_deg * 1023.0 / 300.0).round() as u16,
            speed_rpm: Some(0.0),
            load: Some("+12.5%".to_string()),
            voltage_v: Some(11.8),
            temperature_c: Some(38.0),
            torque_enabled: Some(true),
            status_return_level: Some(2),
        }
    }

    pub fn set_fail_move(&self, fail: bool) {
        self.state.lock().fail_move = fail;
    }

    pub fn set_fail_stop(&self, fail: bool) {
        self.state.lock().fail_stop = fail;
    }

    pub fn set_fail_resume(&self, fail: bool) {
        self.state.lock().fail_resume = fail;
    }

    pub fn set_fail_reset(&self, fail: bool) {
        self.state.lock().fail_reset = fail;
    }

    pub fn set_fail_torque(&self, fail: bool) {
        self.state.lock().fail_torque = fail;
    }

    /// 设定某个舵机的遥测应答
    pub fn set_telemetry(&self, servo: ServoId, data: InspectData) {
        self.state.lock().telemetry.insert(servo, data);
    }

    /// 让某个舵机的 `inspect` 失败（其余舵机不受影响）
    pub fn set_servo_failing(&self, servo: ServoId, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing_servos.insert(servo);
        } else {
            state.failing_servos.remove(&servo);
        }
    }

    /// 挡住下一次指令调用（move/stop/resume/reset/torque），
    /// 直到测试向对应的 Sender 发送一条消息或将其丢弃。
    pub fn gate_next_command(&self, gate: Receiver<()>) {
        self.state.lock().gate = Some(gate);
    }

    /// 到目前为止记录的所有调用
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    fn injected() -> ApiError {
        ApiError::Transport("injected failure".to_string())
    }

    /// 记录调用并在设置了闸门时阻塞等待放行
    ///
    /// 等待期间不持锁，测试线程仍可翻转失败开关。
    fn record_and_wait(&self, call: MockCall) {
        let gate = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.gate.take()
        };
        if let Some(gate) = gate {
            // Sender 被丢弃也算放行
            let _ = gate.recv();
        }
    }
}

impl ArmTransport for MockTransport {
    fn move_joint(&self, servo: ServoId, angle_deg: f64) -> Result<MoveResponse, ApiError> {
        self.record_and_wait(MockCall::Move { servo, angle_deg });
        if self.state.lock().fail_move {
            return Err(Self::injected());
        }
        Ok(MoveResponse {
            servo_id: servo.0,
            angle_deg,
        })
    }

    fn stop(&self) -> Result<AckResponse, ApiError> {
        self.record_and_wait(MockCall::Stop);
        if self.state.lock().fail_stop {
            return Err(Self::injected());
        }
        Ok(AckResponse {
            status: "torque_disabled_all".to_string(),
        })
    }

    fn resume(&self) -> Result<AckResponse, ApiError> {
        self.record_and_wait(MockCall::Resume);
        if self.state.lock().fail_resume {
            return Err(Self::injected());
        }
        Ok(AckResponse {
            status: "torque_enabled_all".to_string(),
        })
    }

    fn reset(&self) -> Result<AckResponse, ApiError> {
        self.record_and_wait(MockCall::Reset);
        if self.state.lock().fail_reset {
            return Err(Self::injected());
        }
        Ok(AckResponse {
            status: "custom_reset_done".to_string(),
        })
    }

    fn torque(&self, servo: ServoId, enable: bool) -> Result<TorqueResponse, ApiError> {
        self.record_and_wait(MockCall::Torque { servo, enable });
        if self.state.lock().fail_torque {
            return Err(Self::injected());
        }
        Ok(TorqueResponse {
            servo_id: servo.0,
            torque: enable,
        })
    }

    fn inspect(&self, servo: ServoId) -> Result<InspectData, ApiError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Inspect(servo));
        if state.failing_servos.contains(&servo) {
            return Err(Self::injected());
        }
        state
            .telemetry
            .get(&servo)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 504,
                detail: "No response from servo".to_string(),
            })
    }

    fn status(&self) -> Result<StatusResponse, ApiError> {
        self.record_and_wait(MockCall::Status);
        Ok(StatusResponse {
            status: "active".to_string(),
            time: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_is_per_servo() {
        let mock = MockTransport::new();
        for id in 1..=4u8 {
            mock.set_telemetry(
                ServoId(id),
                MockTransport::sample_inspect(ServoId(id), 150.0),
            );
        }
        mock.set_servo_failing(ServoId(3), true);

        let ids: Vec<ServoId> = (1..=4).map(ServoId).collect();
        let results = mock.inspect_all(&ids);
        assert_eq!(results.len(), 4);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_ok());
        assert!(results[2].1.is_err());
        assert!(results[3].1.is_ok());
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let mock = MockTransport::new();
        let _ = mock.move_joint(ServoId(2), 120.0);
        let _ = mock.stop();
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::Move {
                    servo: ServoId(2),
                    angle_deg: 120.0
                },
                MockCall::Stop,
            ]
        );
    }

    #[test]
    fn test_gate_blocks_until_released() {
        use std::sync::Arc;
        use std::time::Duration;

        let mock = Arc::new(MockTransport::new());
        let (release, gate) = crossbeam_channel::bounded::<()>(1);
        mock.gate_next_command(gate);

        let worker = {
            let mock = Arc::clone(&mock);
            std::thread::spawn(move || mock.torque(ServoId(1), false))
        };

        // 调用已被记录但尚未返回
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(mock.calls().len(), 1);
        assert!(!worker.is_finished());

        release.send(()).unwrap();
        assert!(worker.join().unwrap().is_ok());
    }
}
