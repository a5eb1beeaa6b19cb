use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 扫描取消令牌
///
/// 克隆后共享同一个取消标志，可由其他线程调用 `cancel`；可选的截止时间到达后
/// 同样视为已取消。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置从现在起的超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// 是否已被取消或已超时
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());

        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_deadline() {
        assert!(CancelToken::new().with_timeout(Duration::ZERO).is_cancelled());
        assert!(!CancelToken::new()
            .with_timeout(Duration::from_secs(3600))
            .is_cancelled());
    }
}
