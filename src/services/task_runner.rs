// ==========================================
// Excel 导入系统 - 后台任务调度
// ==========================================
// 职责: 按队列等级调度异步任务，并施加外部超时上限
// 实现: 每个队列一个信号量控制并发，tokio::time::timeout 控制时长，
//       已结束的任务在下次调度时从 JoinSet 中回收
// 说明: 任务超时即被丢弃并触发 on_timeout 回调，
//       未提交的事务随连接关闭由 SQLite 回滚
// ==========================================

use crate::domain::QueueClass;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// 任务超时后执行的回调
pub type TimeoutHook = Box<dyn FnOnce() + Send + 'static>;

/// 调度参数
pub struct ScheduleOptions {
    pub queue: QueueClass,
    pub timeout: Duration,
    /// 任务名（日志用）
    pub job_name: String,
    pub on_timeout: Option<TimeoutHook>,
}

impl ScheduleOptions {
    pub fn new(queue: QueueClass, timeout: Duration, job_name: impl Into<String>) -> Self {
        Self {
            queue,
            timeout,
            job_name: job_name.into(),
            on_timeout: None,
        }
    }

    pub fn on_timeout(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_timeout = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for ScheduleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleOptions")
            .field("queue", &self.queue)
            .field("timeout", &self.timeout)
            .field("job_name", &self.job_name)
            .field("on_timeout", &self.on_timeout.is_some())
            .finish()
    }
}

/// 任务调度器
///
/// 调用方只得到"已受理"的确认，任务结果不回传
pub trait TaskRunner: Send + Sync {
    fn schedule(&self, task: BoxFuture<'static, ()>, options: ScheduleOptions) -> anyhow::Result<()>;
}

/// 各队列的并发上限
#[derive(Debug, Clone, Copy)]
pub struct QueueWorkers {
    pub short: usize,
    pub default: usize,
    pub long: usize,
}

impl Default for QueueWorkers {
    fn default() -> Self {
        Self {
            short: 4,
            default: 4,
            long: 2,
        }
    }
}

// ==========================================
// TokioTaskRunner
// ==========================================
pub struct TokioTaskRunner {
    queues: HashMap<QueueClass, Arc<Semaphore>>,
    tasks: Mutex<JoinSet<()>>,
}

impl TokioTaskRunner {
    pub fn new(workers: QueueWorkers) -> Self {
        let mut queues = HashMap::new();
        queues.insert(QueueClass::Short, Arc::new(Semaphore::new(workers.short.max(1))));
        queues.insert(QueueClass::Default, Arc::new(Semaphore::new(workers.default.max(1))));
        queues.insert(QueueClass::Long, Arc::new(Semaphore::new(workers.long.max(1))));
        Self {
            queues,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// 等待所有已调度的任务结束
    pub async fn join_all(&self) {
        loop {
            let mut pending = match self.tasks.lock() {
                Ok(mut tasks) => std::mem::take(&mut *tasks),
                Err(_) => return,
            };
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                log_join_result(result);
            }
        }
    }

    /// 尚未回收的任务数（含排队中与运行中）
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "后台任务异常退出");
    }
}

impl Default for TokioTaskRunner {
    fn default() -> Self {
        Self::new(QueueWorkers::default())
    }
}

impl TaskRunner for TokioTaskRunner {
    fn schedule(&self, task: BoxFuture<'static, ()>, options: ScheduleOptions) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow::anyhow!("no async runtime available: {}", e))?;

        let semaphore = self
            .queues
            .get(&options.queue)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown queue: {}", options.queue))?;

        let ScheduleOptions {
            queue,
            timeout,
            job_name,
            on_timeout,
        } = options;

        let guarded = async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(job = %job_name, error = %e, "队列已关闭，任务未执行");
                    return;
                }
            };

            debug!(job = %job_name, queue = %queue, "后台任务开始");
            match tokio::time::timeout(timeout, task).await {
                Ok(()) => debug!(job = %job_name, "后台任务结束"),
                Err(_) => {
                    error!(
                        job = %job_name,
                        timeout_secs = timeout.as_secs(),
                        "后台任务超时，已终止"
                    );
                    if let Some(hook) = on_timeout {
                        hook();
                    }
                }
            }
        };

        let mut tasks = self
            .tasks
            .lock()
            .map_err(|e| anyhow::anyhow!("task registry poisoned: {}", e))?;
        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
        tasks.spawn_on(guarded, &runtime);
        drop(tasks);

        info!(queue = %queue, "后台任务已受理");
        Ok(())
    }
}
