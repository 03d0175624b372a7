// ==========================================
// Excel 导入系统 - 事件通道与进度发布
// ==========================================
// 职责: 定义发布/订阅通道 trait，导入引擎只依赖 trait
// 实现: NoOpEventChannel（测试/无订阅者）、BroadcastEventChannel（进程内广播）
// ==========================================

use crate::domain::ProgressEvent;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast;

/// 广播通道默认容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

// ==========================================
// 事件通道 Trait
// ==========================================

/// 发布/订阅通道
///
/// # 参数
/// - `topic`: 主题
/// - `payload`: JSON 载荷
/// - `target_user`: 目标用户（None 表示广播给所有订阅者）
pub trait EventChannel: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        target_user: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作通道
#[derive(Debug, Clone, Default)]
pub struct NoOpEventChannel;

impl EventChannel for NoOpEventChannel {
    fn publish(
        &self,
        topic: &str,
        _payload: serde_json::Value,
        target_user: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(topic, ?target_user, "NoOpEventChannel: 跳过事件发布");
        Ok(())
    }
}

/// 通道消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub topic: String,
    pub payload: serde_json::Value,
    pub user: Option<String>,
}

/// 进程内广播通道（tokio broadcast）
///
/// 没有订阅者时发布不报错，消息直接丢弃。
#[derive(Debug, Clone)]
pub struct BroadcastEventChannel {
    sender: broadcast::Sender<ChannelMessage>,
}

impl BroadcastEventChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventChannel for BroadcastEventChannel {
    fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        target_user: Option<&str>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let message = ChannelMessage {
            topic: topic.to_string(),
            payload,
            user: target_user.map(str::to_string),
        };
        if self.sender.send(message).is_err() {
            tracing::trace!(topic, "无订阅者，消息已丢弃");
        }
        Ok(())
    }
}

// ==========================================
// ProgressPublisher
// ==========================================

/// 进度事件发布者
///
/// 绑定主题与目标用户；发布失败只记日志，不影响导入流程
#[derive(Clone)]
pub struct ProgressPublisher {
    channel: Arc<dyn EventChannel>,
    topic: String,
    target_user: Option<String>,
}

impl ProgressPublisher {
    pub fn new(
        channel: Arc<dyn EventChannel>,
        topic: impl Into<String>,
        target_user: Option<String>,
    ) -> Self {
        Self {
            channel,
            topic: topic.into(),
            target_user,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish(&self, event: &ProgressEvent) {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "进度事件序列化失败");
                return;
            }
        };

        if let Err(e) = self
            .channel
            .publish(&self.topic, payload, self.target_user.as_deref())
        {
            tracing::warn!(topic = %self.topic, error = %e, "进度事件发布失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunStatus;

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscriber() {
        let channel = Arc::new(BroadcastEventChannel::default());
        let mut rx = channel.subscribe();

        let publisher =
            ProgressPublisher::new(channel.clone(), "excel_import_progress", Some("alice".to_string()));
        publisher.publish(&ProgressEvent::in_progress(50, 20, "row 10".to_string()));

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, "excel_import_progress");
        assert_eq!(message.user.as_deref(), Some("alice"));

        let event: ProgressEvent = serde_json::from_value(message.payload).unwrap();
        assert_eq!(event.progress_percent, 50);
        assert_eq!(event.status, RunStatus::InProgress);
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let channel = BroadcastEventChannel::new(4);
        assert!(channel
            .publish("topic", serde_json::json!({}), None)
            .is_ok());
        assert!(NoOpEventChannel
            .publish("topic", serde_json::json!({}), None)
            .is_ok());
    }
}
