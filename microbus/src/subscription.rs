use std::fmt::{Display, Formatter};

/// 订阅 ID
///
/// 由所属 `EventBus` 在订阅时单调分配，仅作为退订键使用：
/// - 同一注册表内唯一，退订后也不会复用；
/// - 不同注册表之间互相独立，ID 可能重复。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
