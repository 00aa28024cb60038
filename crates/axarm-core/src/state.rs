//! 状态存储
//!
//! 相信的臂状态、关节角与逐舵机遥测的唯一权威持有者。
//! 变更只有两条路径：指令分发器的乐观写入/结算对账，以及
//! 同步循环的遥测刷新（经由分发器的事件泵应用）。
//!
//! # 同步机制
//!
//! - 关节角表：`ArcSwap`（渲染循环每帧读取，wait-free）
//! - 舵机遥测表：`parking_lot::RwLock`（读多写少）
//! - 急停/在途计数：原子量（热路径标志）
//! - 指令历史：`Mutex`（低频追加）
//!
//! # 对账策略
//!
//! 遥测对**只读推导字段**（当前位置、速度、负载、电压、温度）
//! 永远获胜；本地分发的 `torque_enabled` 写入在其往返结算前保持
//! 权威——用逐舵机的在途计数挡住过期遥测，用写代数忽略被更新
//! 写入压制的迟到结算（后发的本地意图获胜）。观测到的 `inspect`
//! 契约不回报目标位置，因此目标角天然只有本地写者。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use axarm_api::{InspectData, ServoId};
use parking_lot::{Mutex, RwLock};

use crate::config::{ArmConfig, JointId};
use crate::link::LinkMonitor;
use crate::log::{CommandLog, CommandLogEntry, CommandOutcome};

/// 相信的关节角集合（度，原始舵机角）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngles {
    pub base: f64,
    pub shoulder: f64,
    pub elbow: f64,
    pub gripper: f64,
}

impl JointAngles {
    pub fn get(&self, joint: JointId) -> f64 {
        match joint {
            JointId::Base => self.base,
            JointId::Shoulder => self.shoulder,
            JointId::Elbow => self.elbow,
            JointId::Gripper => self.gripper,
        }
    }

    pub fn set(&mut self, joint: JointId, angle_deg: f64) {
        match joint {
            JointId::Base => self.base = angle_deg,
            JointId::Shoulder => self.shoulder = angle_deg,
            JointId::Elbow => self.elbow = angle_deg,
            JointId::Gripper => self.gripper = angle_deg,
        }
    }
}

/// 单舵机的相信遥测
#[derive(Debug, Clone, PartialEq)]
pub struct ServoTelemetry {
    /// 当前位置（度）
    pub present_position_deg: f64,
    /// 目标位置（度，本地写者独有）
    pub goal_position_deg: f64,
    /// 当前转速（rpm）
    pub present_speed_rpm: f64,
    /// 当前负载（带符号百分比）
    pub present_load_percent: f64,
    /// 扭矩使能
    pub torque_enabled: bool,
    /// 扭矩限制（%，观测契约中只在本地维护）
    pub torque_limit_percent: f64,
    /// 供电电压（V）
    pub present_voltage_v: f64,
    /// 温度（°C）
    pub present_temperature_c: f64,
    /// LED 状态（展示用）
    pub led_state: bool,
}

impl ServoTelemetry {
    fn initial(preset_deg: f64) -> Self {
        Self {
            present_position_deg: preset_deg,
            goal_position_deg: preset_deg,
            present_speed_rpm: 0.0,
            present_load_percent: 0.0,
            torque_enabled: true,
            torque_limit_percent: 100.0,
            present_voltage_v: 0.0,
            present_temperature_c: 0.0,
            led_state: false,
        }
    }

    /// `moving` 是纯推导，不落存储：|present − goal| 超过阈值即在动
    pub fn is_moving(&self, epsilon_deg: f64) -> bool {
        (self.present_position_deg - self.goal_position_deg).abs() > epsilon_deg
    }
}

/// 舵机条目：相信的遥测 + 乐观写入的对账簿记
struct ServoState {
    telemetry: ServoTelemetry,
    /// 最近一次本地扭矩写入的代数（后发写入压制旧结算）
    torque_gen: u64,
    /// 未结算的扭矩往返数（非零时遥测不得覆盖 torque_enabled）
    torque_inflight: u32,
}

/// 臂状态快照（读取时组装，不落存储）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmStatus {
    /// 超时窗口内收到过遥测
    pub connected: bool,
    /// 有在途指令尚未结算
    pub moving: bool,
    /// 急停闭锁
    pub emergency: bool,
    /// 链上最高温度（°C，聚合展示值）
    pub temperature_c: f64,
    /// 平均供电电压（V，聚合展示值）
    pub power_v: f64,
}

/// 状态存储
pub struct StateStore {
    emergency: AtomicBool,
    in_flight: AtomicUsize,
    joints: ArcSwap<JointAngles>,
    servos: RwLock<BTreeMap<ServoId, ServoState>>,
    log: Mutex<CommandLog>,
    link: LinkMonitor,
    moving_epsilon_deg: f64,
}

impl StateStore {
    /// 按部署配置初始化：关节角取预设位姿，遥测从默认值起步
    pub fn new(config: &ArmConfig) -> Self {
        let mut angles = JointAngles::default();
        let mut servos = BTreeMap::new();
        for (&joint, jc) in &config.joints {
            angles.set(joint, jc.preset_deg);
            servos.insert(
                jc.servo,
                ServoState {
                    telemetry: ServoTelemetry::initial(jc.preset_deg),
                    torque_gen: 0,
                    torque_inflight: 0,
                },
            );
        }
        Self {
            emergency: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            joints: ArcSwap::from_pointee(angles),
            servos: RwLock::new(servos),
            log: Mutex::new(CommandLog::new(config.log_capacity)),
            link: LinkMonitor::new(Duration::from_millis(config.link_timeout_ms)),
            moving_epsilon_deg: config.moving_epsilon_deg,
        }
    }

    // ==================== 读取 ====================

    /// 臂状态快照
    pub fn status(&self) -> ArmStatus {
        let servos = self.servos.read();
        let temperature_c = servos
            .values()
            .map(|s| s.telemetry.present_temperature_c)
            .fold(0.0_f64, f64::max);
        let power_v = if servos.is_empty() {
            0.0
        } else {
            servos
                .values()
                .map(|s| s.telemetry.present_voltage_v)
                .sum::<f64>()
                / servos.len() as f64
        };
        ArmStatus {
            connected: self.link.is_connected(),
            moving: self.in_flight.load(Ordering::Acquire) > 0,
            emergency: self.emergency.load(Ordering::Acquire),
            temperature_c,
            power_v,
        }
    }

    /// 急停是否闭锁
    pub fn emergency(&self) -> bool {
        self.emergency.load(Ordering::Acquire)
    }

    /// 相信的关节角（wait-free，渲染循环每帧调用）
    pub fn joint_angles(&self) -> JointAngles {
        **self.joints.load()
    }

    /// 单舵机遥测快照
    pub fn servo(&self, servo: ServoId) -> Option<ServoTelemetry> {
        self.servos.read().get(&servo).map(|s| s.telemetry.clone())
    }

    /// 全链遥测快照（按舵机地址升序）
    pub fn servos(&self) -> Vec<(ServoId, ServoTelemetry)> {
        self.servos
            .read()
            .iter()
            .map(|(&id, s)| (id, s.telemetry.clone()))
            .collect()
    }

    /// `moving` 推导阈值（度）
    pub fn moving_epsilon_deg(&self) -> f64 {
        self.moving_epsilon_deg
    }

    /// 指令历史全量快照
    pub fn log_snapshot(&self) -> Vec<CommandLogEntry> {
        self.log.lock().snapshot()
    }

    /// 指令历史最近 n 条
    pub fn log_tail(&self, n: usize) -> Vec<CommandLogEntry> {
        self.log.lock().tail(n)
    }

    // ==================== 变更（仅限 crate 内部） ====================

    pub(crate) fn append_log(&self, description: String, outcome: CommandOutcome) -> u64 {
        self.log.lock().append(description, outcome)
    }

    pub(crate) fn settle_log(&self, seq: u64, outcome: CommandOutcome) {
        self.log.lock().settle(seq, outcome);
    }

    /// 急停闭锁：同步置位，不依赖远程结果；在途计数清零
    pub(crate) fn trip_emergency(&self) {
        self.emergency.store(true, Ordering::Release);
        self.in_flight.store(0, Ordering::Release);
    }

    pub(crate) fn clear_emergency(&self) {
        self.emergency.store(false, Ordering::Release);
    }

    pub(crate) fn begin_command(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    /// 急停可能已把计数清零，迟到的结算饱和递减
    pub(crate) fn end_command(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                n.checked_sub(1)
            });
    }

    /// 乐观写入相信的关节角
    pub(crate) fn set_joint_angle(&self, joint: JointId, angle_deg: f64) {
        self.joints.rcu(|cur| {
            let mut next = **cur;
            next.set(joint, angle_deg);
            next
        });
    }

    /// 乐观写入舵机目标位置（随 move 指令）
    pub(crate) fn write_goal(&self, servo: ServoId, angle_deg: f64) {
        if let Some(state) = self.servos.write().get_mut(&servo) {
            state.telemetry.goal_position_deg = angle_deg;
        }
    }

    /// 乐观写入扭矩使能；返回（先前值, 本次写代数）用于补偿回滚
    pub(crate) fn write_torque(&self, servo: ServoId, enable: bool) -> Option<(bool, u64)> {
        let mut servos = self.servos.write();
        let state = servos.get_mut(&servo)?;
        let prior = state.telemetry.torque_enabled;
        state.telemetry.torque_enabled = enable;
        state.torque_gen += 1;
        state.torque_inflight += 1;
        Some((prior, state.torque_gen))
    }

    /// 结算一次扭矩往返
    ///
    /// 失败时仅当本次写入仍是最新代数才回滚到先前值——
    /// 若期间又有更新的本地写入，迟到的失败被忽略（后发意图获胜）。
    pub(crate) fn settle_torque(&self, servo: ServoId, generation: u64, prior: bool, ok: bool) {
        let mut servos = self.servos.write();
        let Some(state) = servos.get_mut(&servo) else {
            return;
        };
        state.torque_inflight = state.torque_inflight.saturating_sub(1);
        if !ok && generation == state.torque_gen {
            state.telemetry.torque_enabled = prior;
        }
    }

    /// 本地维护的扭矩限制（观测契约没有对应远程调用）
    pub(crate) fn set_torque_limit(&self, servo: ServoId, limit_percent: f64) -> Option<()> {
        let mut servos = self.servos.write();
        let state = servos.get_mut(&servo)?;
        state.telemetry.torque_limit_percent = limit_percent;
        Some(())
    }

    /// 应用一份新鲜遥测
    ///
    /// 只读推导字段无条件采纳；`null` 字段保留旧值；
    /// `torque_enabled` 在有未结算的本地写入时不覆盖。
    pub(crate) fn apply_telemetry(&self, servo: ServoId, data: &InspectData) {
        let mut servos = self.servos.write();
        let Some(state) = servos.get_mut(&servo) else {
            return;
        };
        let t = &mut state.telemetry;
        t.present_position_deg = data.position_deg;
        if let Some(speed) = data.speed_rpm {
            t.present_speed_rpm = speed;
        }
        if let Some(load) = data.load_percent() {
            t.present_load_percent = load;
        }
        if let Some(voltage) = data.voltage_v {
            t.present_voltage_v = voltage;
        }
        if let Some(temp) = data.temperature_c {
            t.present_temperature_c = temp;
        }
        if state.torque_inflight == 0
            && let Some(torque) = data.torque_enabled
        {
            t.torque_enabled = torque;
        }
    }

    /// 一轮遥测成功，喂连接监视器
    pub(crate) fn mark_telemetry_seen(&self) {
        self.link.register_telemetry();
    }
}
