use bon::Builder;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_NAME: &str = "microbus-event-loop";

/// 事件循环配置
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// 工作线程名（用于日志与调试器）
    #[builder(into, default = DEFAULT_THREAD_NAME.to_string())]
    pub thread_name: String,
    /// 工作线程栈大小；为空时使用平台默认值
    pub stack_size: Option<usize>,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}
