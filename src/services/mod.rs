// ==========================================
// Excel 导入系统 - 服务层
// ==========================================
// 职责: 事件通道 + 后台任务调度（导入引擎的外部协作者）
// ==========================================

pub mod events;
pub mod task_runner;

pub use events::{
    BroadcastEventChannel, ChannelMessage, EventChannel, NoOpEventChannel, ProgressPublisher,
};
pub use task_runner::{QueueWorkers, ScheduleOptions, TaskRunner, TokioTaskRunner};
