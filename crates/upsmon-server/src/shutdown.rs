use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT - Ctrl+C
    Interrupt,

    /// 手动触发
    Manual,
}

/// 信号处理器
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl SignalHandler {
    pub fn new() -> (Self, broadcast::Receiver<ShutdownSignal>) {
        let (tx, rx) = broadcast::channel(16);
        (Self { shutdown_tx: tx }, rx)
    }

    /// 等待系统信号或手动触发
    #[cfg(unix)]
    pub async fn wait(&self) -> ShutdownSignal {
        use signal::unix::{signal, SignalKind};

        let mut manual = self.shutdown_tx.subscribe();
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Failed to install signal handlers, waiting for manual shutdown");
                    return manual.recv().await.unwrap_or(ShutdownSignal::Manual);
                }
            };

        let received = tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                ShutdownSignal::Term
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
                ShutdownSignal::Interrupt
            }
            signal = manual.recv() => signal.unwrap_or(ShutdownSignal::Manual),
        };
        self.broadcast(received);
        received
    }

    /// 等待系统信号或手动触发（非 unix 平台）
    #[cfg(not(unix))]
    pub async fn wait(&self) -> ShutdownSignal {
        let mut manual = self.shutdown_tx.subscribe();
        let received = tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Received Ctrl+C");
                ShutdownSignal::Interrupt
            }
            signal = manual.recv() => signal.unwrap_or(ShutdownSignal::Manual),
        };
        self.broadcast(received);
        received
    }

    /// 手动触发关闭
    pub fn trigger_shutdown(&self) {
        info!("Manual shutdown triggered");
        let _ = self.shutdown_tx.send(ShutdownSignal::Manual);
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }

    // 手动触发已经广播过，不再重复
    fn broadcast(&self, received: ShutdownSignal) {
        if received != ShutdownSignal::Manual {
            let _ = self.shutdown_tx.send(received);
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_trigger() {
        let (handler, mut rx) = SignalHandler::new();

        handler.trigger_shutdown();

        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Manual);
    }

    #[tokio::test]
    async fn test_wait_returns_on_manual_trigger() {
        let handler = Arc::new(SignalHandler::default());
        let waiter = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.wait().await })
        };

        // 等待 wait() 完成订阅
        tokio::time::sleep(Duration::from_millis(50)).await;
        handler.trigger_shutdown();

        let signal = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Manual);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let (handler, _rx1) = SignalHandler::new();
        let mut rx2 = handler.subscribe();
        let mut rx3 = handler.subscribe();

        handler.trigger_shutdown();

        assert_eq!(rx2.recv().await.unwrap(), ShutdownSignal::Manual);
        assert_eq!(rx3.recv().await.unwrap(), ShutdownSignal::Manual);
    }
}
