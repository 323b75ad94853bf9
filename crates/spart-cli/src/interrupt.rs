//! Ctrl-C forwarding.
//!
//! Tokio keeps its SIGINT handler installed once `ctrl_c()` has been polled,
//! so a single listener task owns it and every wait point selects on the
//! forwarded presses instead.

use tokio::sync::watch;
use tracing::debug;

/// Receiving side of forwarded Ctrl-C presses.
pub struct Interrupts {
    rx: watch::Receiver<u64>,
}

/// Sending side; each `fire` counts as one press.
pub struct InterruptTrigger {
    tx: watch::Sender<u64>,
}

impl InterruptTrigger {
    pub fn fire(&self) {
        self.tx.send_modify(|presses| *presses += 1);
    }
}

impl Interrupts {
    pub fn channel() -> (InterruptTrigger, Self) {
        let (tx, rx) = watch::channel(0);
        (InterruptTrigger { tx }, Self { rx })
    }

    /// Spawns the process-wide listener.
    pub fn listen() -> Self {
        let (trigger, interrupts) = Self::channel();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                debug!("ctrl-c received");
                trigger.fire();
            }
        });
        interrupts
    }

    /// Resolves on the next press not yet seen. Never resolves once the
    /// listener is gone.
    pub async fn recv(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
