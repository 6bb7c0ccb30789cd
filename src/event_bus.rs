// 事件总线 - 分析进度通知
//
// 分析流程只负责发布事件，展示层订阅后自行决定如何显示进度
// 使用 tokio::sync::broadcast 实现事件分发

use tokio::sync::broadcast;
use uuid::Uuid;

/// 分析事件
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// 上传通过校验
    UploadAccepted {
        file_name: String,
        size_bytes: u64,
    },

    /// 上传被拒绝
    UploadRejected {
        file_name: String,
        reason: String,
    },

    /// 抽帧完成
    FramesExtracted {
        count: usize,
    },

    /// 模型已返回
    ModelResponded {
        chars: usize,
    },

    /// 分析结束（degraded 表示使用了演示数据）
    AnalysisCompleted {
        analysis_id: Uuid,
        degraded: bool,
    },
}

/// 事件总线
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: AppEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_basic() {
        let bus = EventBus::new(16);
        let mut receiver = bus.subscribe();

        bus.publish(AppEvent::FramesExtracted { count: 42 });

        match receiver.recv().await {
            Ok(AppEvent::FramesExtracted { count }) => assert_eq!(count, 42),
            _ => panic!("未收到预期事件"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(AppEvent::AnalysisCompleted {
            analysis_id: Uuid::new_v4(),
            degraded: true,
        });

        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(AppEvent::ModelResponded { chars: 10 });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
