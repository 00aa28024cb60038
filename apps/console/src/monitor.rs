//! Watch 模式：常驻监控循环
//!
//! 一个线程跑满整个渲染循环：泵结算/遥测事件 → 读相信的关节角 →
//! 映射成目标旋转 → 指数平滑 → 正运动学解算 → 打印总览帧。
//! 同步循环和指令工作线程在后台各自运行，Ctrl-C 触发有序停机。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use axarm_core::{ArmConfig, ArmTransport, Dispatcher, JointId, ServoTelemetry, SyncLoop};
use axarm_scene::{ArmPose, ArmScene, JointMapper, PoseTargets, gripper_half_radians};

/// 温度告警阈值（°C）
const TEMP_ALERT_C: f64 = 70.0;
/// 供电电压告警阈值（V）
const VOLTAGE_ALERT_V: f64 = 10.0;
/// 负载告警阈值（%，绝对值）
const LOAD_ALERT_PERCENT: f64 = 80.0;
/// 每帧展示的指令历史条数
const LOG_TAIL: usize = 5;

pub fn run(
    config: Arc<ArmConfig>,
    transport: Arc<dyn ArmTransport>,
    dispatcher: Dispatcher,
    frequency: u32,
) -> Result<()> {
    let frequency = frequency.max(1);
    let frame = Duration::from_secs(1) / frequency;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Release);
        })
        .context("installing Ctrl-C handler")?;
    }

    let sync = SyncLoop::spawn(
        transport,
        config.servo_ids(),
        Duration::from_millis(config.poll_interval_ms),
        dispatcher.events_sender(),
    );
    info!(frequency, "watch mode started");

    let mappers = Mappers::new(&config);
    let scene = ArmScene::new();
    let mut pose = ArmPose::new(config.smoothing_factor);
    pose.snap_to(&mappers.targets(&dispatcher));

    while running.load(Ordering::Acquire) {
        dispatcher.process_events();
        pose.tick(&mappers.targets(&dispatcher));
        print_frame(&config, &dispatcher, &scene, &pose);
        thread::sleep(frame);
    }

    // 先停同步循环，再让 Dispatcher 的 drop 收掉工作线程
    sync.stop();
    info!("watch mode stopped");
    Ok(())
}

/// 预先从配置绑定的逐关节映射器
struct Mappers {
    base: JointMapper,
    shoulder: JointMapper,
    elbow: JointMapper,
}

impl Mappers {
    fn new(config: &ArmConfig) -> Self {
        let bind = |joint: JointId| {
            let jc = config.joint(joint);
            JointMapper::new(jc.direction, jc.offset_deg)
        };
        Self {
            base: bind(JointId::Base),
            shoulder: bind(JointId::Shoulder),
            elbow: bind(JointId::Elbow),
        }
    }

    fn targets(&self, dispatcher: &Dispatcher) -> PoseTargets {
        let angles = dispatcher.store().joint_angles();
        PoseTargets {
            base_rad: self.base.target_radians(angles.base),
            shoulder_rad: self.shoulder.target_radians(angles.shoulder),
            elbow_rad: self.elbow.target_radians(angles.elbow),
            gripper_half_rad: gripper_half_radians(angles.gripper),
        }
    }
}

fn print_frame(config: &ArmConfig, dispatcher: &Dispatcher, scene: &ArmScene, pose: &ArmPose) {
    let store = dispatcher.store();
    let status = store.status();
    let positions = scene.solve(pose);

    // 清屏 + 归位
    print!("\x1B[2J\x1B[H");
    println!(
        "axarm  link:{}  moving:{}  emergency:{}  temp:{:.1}°C  power:{:.1}V",
        if status.connected { "up" } else { "DOWN" },
        if status.moving { "yes" } else { "no" },
        if status.emergency { "LATCHED" } else { "no" },
        status.temperature_c,
        status.power_v,
    );
    if positions.touches_ground() {
        println!(
            "!! GROUND CONTACT  lowest joint at y={:.2}",
            positions.lowest_y()
        );
    }
    println!(
        "pose  base:{:+.2}  shoulder:{:+.2}  elbow:{:+.2}  grip:{:+.2}/{:+.2} rad",
        pose.base_rad, pose.shoulder_rad, pose.elbow_rad, pose.gripper_left_rad,
        pose.gripper_right_rad,
    );

    println!();
    let epsilon = store.moving_epsilon_deg();
    let servos = store.servos();
    let torque_on = servos.iter().filter(|(_, t)| t.torque_enabled).count();
    let moving = servos.iter().filter(|(_, t)| t.is_moving(epsilon)).count();
    let unhealthy = servos
        .iter()
        .filter(|(_, t)| !health_flags(t).is_empty())
        .count();
    println!(
        "chain  torque-on:{}/{}  moving:{}  unhealthy:{}",
        torque_on,
        servos.len(),
        moving,
        unhealthy,
    );
    for (servo, telemetry) in servos {
        let joint = config
            .joint_for(servo)
            .map(|j| j.as_str())
            .unwrap_or("unmapped");
        println!(
            "  {servo} {joint:<8} pos:{:>6.1}° goal:{:>6.1}° speed:{:>5.1}rpm load:{:>+6.1}% \
             torque:{} {:>4.1}V {:>4.1}°C{}{}",
            telemetry.present_position_deg,
            telemetry.goal_position_deg,
            telemetry.present_speed_rpm,
            telemetry.present_load_percent,
            if telemetry.torque_enabled { "on " } else { "off" },
            telemetry.present_voltage_v,
            telemetry.present_temperature_c,
            if telemetry.is_moving(epsilon) {
                "  moving"
            } else {
                ""
            },
            health_flags(&telemetry),
        );
    }

    println!();
    for entry in store.log_tail(LOG_TAIL) {
        println!(
            "  #{:<4} {:<40} [{}]",
            entry.seq,
            entry.description,
            entry.outcome.as_str()
        );
    }
}

/// 超过健康阈值的字段标记
fn health_flags(telemetry: &ServoTelemetry) -> String {
    let mut flags = String::new();
    if telemetry.present_temperature_c > TEMP_ALERT_C {
        flags.push_str("  HOT");
    }
    if telemetry.present_voltage_v > 0.0 && telemetry.present_voltage_v < VOLTAGE_ALERT_V {
        flags.push_str("  LOW-VOLTAGE");
    }
    if telemetry.present_load_percent.abs() > LOAD_ALERT_PERCENT {
        flags.push_str("  OVERLOAD");
    }
    flags
}
