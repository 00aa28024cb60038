//! # axarm-console
//!
//! 4 自由度 Dynamixel 机械臂的操作台。
//!
//! ## One-shot 模式（适合脚本/排障）
//!
//! ```bash
//! # 移动肩关节到 120°（分发 → 等待结算 → 退出）
//! axarm-console move shoulder 120
//!
//! # 急停 / 解除 / 回预设位姿
//! axarm-console stop
//! axarm-console resume
//! axarm-console reset
//!
//! # 单舵机扭矩开关与遥测读取
//! axarm-console torque 2 off
//! axarm-console inspect 2
//! ```
//!
//! ## Watch 模式（常驻监控）
//!
//! ```bash
//! # 遥测轮询 + 姿态解算 + 触地告警 + 指令历史，Ctrl-C 退出
//! axarm-console --url http://192.168.0.10:8000/api watch --frequency 10
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

mod monitor;

use axarm_api::HttpTransport;
use axarm_core::{
    ArmConfig, ArmTransport, CommandOutcome, Dispatcher, JointId, ServoId, StateStore,
};

/// axarm-console - 机械臂操作台
#[derive(Parser, Debug)]
#[command(name = "axarm-console")]
#[command(about = "Operator console for a 4-DOF Dynamixel servo arm", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（TOML；缺省用内置部署表）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 覆盖远程接口基地址
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// 命令行上的关节名
#[derive(ValueEnum, Clone, Copy, Debug)]
enum JointArg {
    Base,
    Shoulder,
    Elbow,
    Gripper,
}

impl From<JointArg> for JointId {
    fn from(arg: JointArg) -> Self {
        match arg {
            JointArg::Base => JointId::Base,
            JointArg::Shoulder => JointId::Shoulder,
            JointArg::Elbow => JointId::Elbow,
            JointArg::Gripper => JointId::Gripper,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 移动关节到目标角度（度）
    Move { joint: JointArg, angle: f64 },

    /// 急停（本地即刻闭锁，随后通知远端）
    Stop,

    /// 解除急停
    Resume,

    /// 回预设位姿（同时解除急停）
    Reset,

    /// 单舵机扭矩开关
    Torque { servo: u8, state: Switch },

    /// 设置单舵机扭矩限制（本地簿记，0–100%）
    TorqueLimit { servo: u8, limit: f64 },

    /// 读取单舵机遥测；不带参数读整条链
    Inspect { servo: Option<u8> },

    /// 远端存活探针
    Status,

    /// 监控模式：遥测轮询 + 姿态/触地/健康总览
    Watch {
        /// 渲染刷新频率（Hz）
        #[arg(short, long, default_value_t = 10)]
        frequency: u32,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("axarm_console=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ArmConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ArmConfig::default_config(),
    };
    if let Some(url) = cli.url {
        config.remote_url = url;
    }
    let config = Arc::new(config);

    let transport: Arc<dyn ArmTransport> = Arc::new(HttpTransport::new(
        config.remote_url.clone(),
        Duration::from_millis(config.http_timeout_ms),
    )?);

    match cli.command {
        // 只读命令直接走传输层，不需要状态机
        Commands::Inspect { servo } => return inspect(&config, transport.as_ref(), servo),
        Commands::Status => {
            let status = transport.status().context("status probe failed")?;
            println!("remote: {} (uptime tick {:.1})", status.status, status.time);
            return Ok(());
        }
        _ => {}
    }

    let store = Arc::new(StateStore::new(&config));
    let dispatcher = Dispatcher::new(store, transport.clone(), config.clone());

    match cli.command {
        Commands::Move { joint, angle } => {
            let seq = dispatcher.move_joint(joint.into(), angle)?;
            settle(&dispatcher, seq)
        }
        Commands::Stop => {
            let seq = dispatcher.emergency_stop();
            settle(&dispatcher, seq)
        }
        Commands::Resume => {
            let seq = dispatcher.resume()?;
            settle(&dispatcher, seq)
        }
        Commands::Reset => {
            let seq = dispatcher.reset()?;
            settle(&dispatcher, seq)
        }
        Commands::Torque { servo, state } => {
            let seq = dispatcher.set_torque(ServoId(servo), matches!(state, Switch::On))?;
            settle(&dispatcher, seq)
        }
        Commands::TorqueLimit { servo, limit } => {
            let seq = dispatcher.set_torque_limit(ServoId(servo), limit)?;
            settle(&dispatcher, seq)
        }
        Commands::Watch { frequency } => monitor::run(config, transport, dispatcher, frequency),
        Commands::Inspect { .. } | Commands::Status => unreachable!("handled above"),
    }
}

/// 结算超时：覆盖一次 HTTP 往返加调度余量
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// 等待指定序号的日志条目到达终局并打印结果
fn settle(dispatcher: &Dispatcher, seq: u64) -> Result<()> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        dispatcher.process_events();
        let entry = dispatcher
            .store()
            .log_snapshot()
            .into_iter()
            .find(|e| e.seq == seq);
        if let Some(entry) = entry
            && entry.outcome.is_terminal()
        {
            println!(
                "#{} {} [{}]",
                entry.seq,
                entry.description,
                entry.outcome.as_str()
            );
            if entry.outcome == CommandOutcome::Failed {
                bail!("command #{seq} failed");
            }
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("command #{seq} did not settle within {SETTLE_TIMEOUT:?}");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

/// One-shot 遥测读取
fn inspect(config: &ArmConfig, transport: &dyn ArmTransport, servo: Option<u8>) -> Result<()> {
    let servos = match servo {
        Some(id) => vec![ServoId(id)],
        None => config.servo_ids(),
    };
    let mut failures = 0usize;
    for (servo, result) in transport.inspect_all(&servos) {
        match result {
            Ok(data) => {
                let joint = config
                    .joint_for(servo)
                    .map(|j| j.as_str())
                    .unwrap_or("unmapped");
                println!(
                    "{servo} ({joint}): {:.1}° raw={} speed={} load={} voltage={} temp={} torque={}",
                    data.position_deg,
                    data.position_raw,
                    fmt_opt(data.speed_rpm, "rpm"),
                    data.load.as_deref().unwrap_or("-"),
                    fmt_opt(data.voltage_v, "V"),
                    fmt_opt(data.temperature_c, "°C"),
                    match data.torque_enabled {
                        Some(true) => "on",
                        Some(false) => "off",
                        None => "-",
                    },
                );
            }
            Err(err) => {
                failures += 1;
                println!("{servo}: read failed: {err}");
            }
        }
    }
    if failures == servos.len() {
        bail!("no servo responded");
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "-".to_string(),
    }
}
