//! 远程同步循环
//!
//! 固定间隔轮询全链遥测，把结果作为事件投递给状态变更泵。
//! 单个舵机读取失败不影响同轮其他舵机（部分失败隔离）；
//! 一轮耗时超过间隔时合并积压的 tick，绝不让轮次堆叠。

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axarm_api::{ArmTransport, ServoId};
use crossbeam_channel::{Sender, bounded, select, tick};
use tracing::{info, trace};

use crate::event::ArmEvent;

/// 同步循环句柄
///
/// 宿主拆除时必须调用 [`SyncLoop::stop`]（或直接 drop）——
/// 循环线程随停机信号退出，不会再向已销毁的视图投递事件。
pub struct SyncLoop {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SyncLoop {
    /// 启动轮询线程
    ///
    /// `events` 通常来自 [`crate::Dispatcher::events_sender`]；
    /// 事件通道关闭时循环自行退出。
    pub fn spawn(
        transport: Arc<dyn ArmTransport>,
        servos: Vec<ServoId>,
        interval: Duration,
        events: Sender<ArmEvent>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let thread = thread::spawn(move || {
            info!(?interval, count = servos.len(), "sync loop started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        let results = transport.inspect_all(&servos);
                        trace!(
                            ok = results.iter().filter(|(_, r)| r.is_ok()).count(),
                            total = results.len(),
                            "telemetry round",
                        );
                        if events.send(ArmEvent::Telemetry { results }).is_err() {
                            // 宿主已拆除
                            break;
                        }
                        // 慢轮次后合并积压的 tick，跳过而不是补跑
                        while ticker.try_recv().is_ok() {}
                    }
                }
            }
            info!("sync loop stopped");
        });
        Self {
            shutdown: shutdown_tx,
            thread: Some(thread),
        }
    }

    /// 停止并等待轮询线程退出
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axarm_api::mock::MockTransport;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_sync_loop_delivers_batches_and_stops() {
        let mock = Arc::new(MockTransport::new());
        for id in 1..=4u8 {
            mock.set_telemetry(
                ServoId(id),
                MockTransport::sample_inspect(ServoId(id), 150.0),
            );
        }
        mock.set_servo_failing(ServoId(3), true);

        let (events_tx, events_rx) = unbounded();
        let servos: Vec<ServoId> = (1..=4).map(ServoId).collect();
        let sync = SyncLoop::spawn(
            mock.clone(),
            servos,
            Duration::from_millis(10),
            events_tx,
        );

        // 至少一轮遥测送达，且逐舵机独立成败
        let event = events_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("telemetry batch");
        match event {
            ArmEvent::Telemetry { results } => {
                assert_eq!(results.len(), 4);
                assert!(results.iter().filter(|(_, r)| r.is_ok()).count() == 3);
                assert!(results[2].1.is_err());
            }
            other => panic!("unexpected event: {other:?}"),
        }

        sync.stop();
    }

    #[test]
    fn test_sync_loop_exits_when_events_channel_closes() {
        let mock = Arc::new(MockTransport::new());
        let (events_tx, events_rx) = unbounded();
        let sync = SyncLoop::spawn(
            mock,
            vec![ServoId(1)],
            Duration::from_millis(5),
            events_tx,
        );

        drop(events_rx);
        // 循环应自行退出；stop 只是等待
        sync.stop();
    }
}
