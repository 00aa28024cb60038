//! 指令历史
//!
//! 只追加、序号严格递增（1 起始、无空洞）的会话内记录。
//! 条目的结算采用"原地 Pending → 终局"的设计：一个 pending 条目
//! 在往返结算后就地改为 completed/failed，终局状态永不回退。
//! 容量有限，超出后从最旧端修剪，但序号计数不受影响、顺序永不重排。

use std::collections::VecDeque;
use std::time::SystemTime;

/// 指令的终局状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 已分发，往返尚未结算
    Pending,
    /// 远程调用成功
    Completed,
    /// 远程调用失败
    Failed,
    /// 急停事实记录（分发即终局，不依赖远程结果）
    Emergency,
}

impl CommandOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommandOutcome::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::Pending => "pending",
            CommandOutcome::Completed => "completed",
            CommandOutcome::Failed => "failed",
            CommandOutcome::Emergency => "emergency",
        }
    }
}

/// 一条指令记录
#[derive(Debug, Clone)]
pub struct CommandLogEntry {
    /// 会话内严格递增的序号（1 起始）
    pub seq: u64,
    /// 分发时刻（墙钟，仅用于展示）
    pub timestamp: SystemTime,
    /// 人类可读的意图描述
    pub description: String,
    /// 当前状态
    pub outcome: CommandOutcome,
}

/// 有容量上限的指令历史
pub struct CommandLog {
    entries: VecDeque<CommandLogEntry>,
    next_seq: u64,
    capacity: usize,
}

impl CommandLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            next_seq: 1,
            capacity: capacity.max(1),
        }
    }

    /// 追加一条记录并返回其序号
    pub fn append(&mut self, description: String, outcome: CommandOutcome) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(CommandLogEntry {
            seq,
            timestamp: SystemTime::now(),
            description,
            outcome,
        });
        // 修剪最旧端；序号继续递增，不重排
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        seq
    }

    /// 原地结算一条 pending 记录
    ///
    /// 终局状态永不改写；已被修剪的序号静默忽略（迟到的结算）。
    pub fn settle(&mut self, seq: u64, outcome: CommandOutcome) {
        debug_assert!(outcome.is_terminal(), "settle requires a terminal outcome");
        if let Some(entry) = self.entries.iter_mut().find(|e| e.seq == seq)
            && !entry.outcome.is_terminal()
        {
            entry.outcome = outcome;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 下一个将被分配的序号
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// 全量快照（按序号升序）
    pub fn snapshot(&self) -> Vec<CommandLogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// 最近 `n` 条
    pub fn tail(&self, n: usize) -> Vec<CommandLogEntry> {
        self.entries
            .iter()
            .rev()
            .take(n)
            .rev()
            .cloned()
            .collect()
    }
}
