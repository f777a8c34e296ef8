//! Progress of a run as immutable event records.
//!
//! The pipeline and orchestrator never keep counters themselves; they hand
//! every event to an [`Observer`]. [`TxStats`] aggregates the counters,
//! [`Dashboard`] logs them as transactions settle and [`TracingObserver`]
//! renders events as log lines.

use std::time::Duration;

use alloy::primitives::{utils::format_units, Address, B256, U256};

/// Severity of a free-form log event, mirroring the dashboard's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
    Loading,
    Step,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Log {
        level: LogLevel,
        message: String,
    },
    WalletBalance {
        wallet: String,
        address: Address,
        /// `None` when the balance could not be read.
        balance: Option<U256>,
        decimals: u8,
    },
    ApprovalSubmitted {
        wallet: String,
    },
    ApprovalConfirmed {
        wallet: String,
        tx_hash: B256,
        link: String,
    },
    ApprovalFailed {
        wallet: String,
        reason: String,
    },
    AttemptStarted {
        wallet: String,
        index: u32,
        total: u32,
    },
    AttemptConfirmed {
        wallet: String,
        index: u32,
        tx_hash: B256,
        elapsed: Duration,
        link: String,
    },
    AttemptFailed {
        wallet: String,
        index: u32,
        reason: String,
    },
    PacketObserved {
        wallet: String,
        index: u32,
        packet_hash: String,
        link: String,
    },
    WalletFinished {
        wallet: String,
        confirmed: u32,
        failed: u32,
    },
}

impl Event {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Event::Log {
            level,
            message: message.into(),
        }
    }
}

pub trait Observer {
    fn notify(&mut self, event: &Event);
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn notify(&mut self, event: &Event) {
        (**self).notify(event)
    }
}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn notify(&mut self, event: &Event) {
        self.0.notify(event);
        self.1.notify(event);
    }
}

/// Counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub pending: u32,
    pub success: u32,
    pub failed: u32,
    pub last_latency: Option<Duration>,
}

/// Transaction counters built from events. Approvals count towards the
/// totals but only bridge transfers record a latency.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TxStats {
    pub success: u32,
    pub failed: u32,
    pub pending: u32,
    pub times: Vec<Duration>,
}

impl TxStats {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pending: self.pending,
            success: self.success,
            failed: self.failed,
            last_latency: self.times.last().copied(),
        }
    }

    fn resolve(&mut self, ok: bool) {
        self.pending = self.pending.saturating_sub(1);
        if ok {
            self.success += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl Observer for TxStats {
    fn notify(&mut self, event: &Event) {
        match event {
            Event::ApprovalSubmitted { .. } | Event::AttemptStarted { .. } => self.pending += 1,
            Event::ApprovalConfirmed { .. } => self.resolve(true),
            Event::ApprovalFailed { .. } | Event::AttemptFailed { .. } => self.resolve(false),
            Event::AttemptConfirmed { elapsed, .. } => {
                self.times.push(*elapsed);
                self.resolve(true);
            }
            _ => {}
        }
    }
}

/// [`TxStats`] that logs a fresh [`Snapshot`] whenever a transaction settles.
#[derive(Debug, Default, Clone)]
pub struct Dashboard {
    stats: TxStats,
    updates: u32,
}

impl Dashboard {
    pub fn stats(&self) -> &TxStats {
        &self.stats
    }

    /// Number of snapshots logged so far.
    pub fn updates(&self) -> u32 {
        self.updates
    }
}

impl Observer for Dashboard {
    fn notify(&mut self, event: &Event) {
        self.stats.notify(event);

        let settled = matches!(
            event,
            Event::ApprovalConfirmed { .. }
                | Event::ApprovalFailed { .. }
                | Event::AttemptConfirmed { .. }
                | Event::AttemptFailed { .. }
        );
        if settled {
            self.updates += 1;
            let snapshot = self.stats.snapshot();
            tracing::info!(
                pending = snapshot.pending,
                success = snapshot.success,
                failed = snapshot.failed,
                last_latency_ms = snapshot.last_latency.map(|d| d.as_millis() as u64),
                "status"
            );
        }
    }
}

/// Writes events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&mut self, event: &Event) {
        use tracing::{error, info, warn};

        match event {
            Event::Log { level, message } => match level {
                LogLevel::Info => info!("{message}"),
                LogLevel::Warn => warn!("{message}"),
                LogLevel::Error => error!("{message}"),
                LogLevel::Success => info!(status = "success", "{message}"),
                LogLevel::Loading => info!(status = "loading", "{message}"),
                LogLevel::Step => info!(status = "step", "{message}"),
            },
            Event::WalletBalance {
                wallet,
                address,
                balance,
                decimals,
            } => match balance.map(|b| format_units(b, *decimals)) {
                Some(Ok(formatted)) => {
                    info!(%wallet, %address, balance = %formatted, "wallet balance")
                }
                _ => warn!(%wallet, %address, "wallet balance unavailable"),
            },
            Event::ApprovalSubmitted { wallet } => {
                info!(
                    %wallet,
                    status = "loading",
                    "token not approved, sending approve transaction"
                )
            }
            Event::ApprovalConfirmed { wallet, link, .. } => {
                info!(%wallet, status = "success", "approve confirmed: {link}")
            }
            Event::ApprovalFailed { wallet, reason } => {
                error!(%wallet, "approve failed: {reason}")
            }
            Event::AttemptStarted {
                wallet,
                index,
                total,
            } => info!(%wallet, "transaction {index}/{total}"),
            Event::AttemptConfirmed {
                wallet,
                index,
                elapsed,
                link,
                ..
            } => info!(
                %wallet,
                index,
                elapsed_ms = elapsed.as_millis() as u64,
                status = "success",
                "transaction confirmed: {link}"
            ),
            Event::AttemptFailed {
                wallet,
                index,
                reason,
            } => error!(%wallet, index, "transaction failed: {reason}"),
            Event::PacketObserved {
                wallet,
                index,
                link,
                ..
            } => info!(%wallet, index, status = "success", "packet submitted: {link}"),
            Event::WalletFinished {
                wallet,
                confirmed,
                failed,
            } => info!(%wallet, confirmed, failed, "wallet done"),
        }
    }
}

/// Keeps every event, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder(pub Vec<Event>);

#[cfg(test)]
impl Observer for Recorder {
    fn notify(&mut self, event: &Event) {
        self.0.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> String {
        "alice".to_string()
    }

    #[test]
    fn stats_follow_attempt_lifecycle() {
        let mut stats = TxStats::default();

        stats.notify(&Event::AttemptStarted {
            wallet: wallet(),
            index: 1,
            total: 2,
        });
        assert_eq!(stats.snapshot().pending, 1);

        stats.notify(&Event::AttemptConfirmed {
            wallet: wallet(),
            index: 1,
            tx_hash: B256::ZERO,
            elapsed: Duration::from_millis(1200),
            link: String::new(),
        });
        stats.notify(&Event::AttemptStarted {
            wallet: wallet(),
            index: 2,
            total: 2,
        });
        stats.notify(&Event::AttemptFailed {
            wallet: wallet(),
            index: 2,
            reason: "nonce too low".into(),
        });

        assert_eq!(
            stats.snapshot(),
            Snapshot {
                pending: 0,
                success: 1,
                failed: 1,
                last_latency: Some(Duration::from_millis(1200)),
            }
        );
        assert_eq!(stats.times, vec![Duration::from_millis(1200)]);
    }

    #[test]
    fn approvals_count_without_latency() {
        let mut stats = TxStats::default();
        stats.notify(&Event::ApprovalSubmitted { wallet: wallet() });
        stats.notify(&Event::ApprovalConfirmed {
            wallet: wallet(),
            tx_hash: B256::ZERO,
            link: String::new(),
        });

        assert_eq!(stats.success, 1);
        assert!(stats.times.is_empty());
    }

    #[test]
    fn dashboard_updates_once_per_settled_transaction() {
        let mut dashboard = Dashboard::default();
        dashboard.notify(&Event::ApprovalSubmitted { wallet: wallet() });
        dashboard.notify(&Event::ApprovalConfirmed {
            wallet: wallet(),
            tx_hash: B256::ZERO,
            link: String::new(),
        });
        dashboard.notify(&Event::AttemptStarted {
            wallet: wallet(),
            index: 1,
            total: 1,
        });
        assert_eq!(dashboard.updates(), 1);

        dashboard.notify(&Event::AttemptFailed {
            wallet: wallet(),
            index: 1,
            reason: "reverted".into(),
        });
        dashboard.notify(&Event::WalletFinished {
            wallet: wallet(),
            confirmed: 0,
            failed: 1,
        });

        assert_eq!(dashboard.updates(), 2);
        assert_eq!(
            dashboard.stats().snapshot(),
            Snapshot {
                pending: 0,
                success: 1,
                failed: 1,
                last_latency: None,
            }
        );
    }

    #[test]
    fn pair_observer_forwards_to_both() {
        let mut pair = (TxStats::default(), Recorder::default());
        pair.notify(&Event::log(LogLevel::Info, "hello"));
        pair.notify(&Event::ApprovalSubmitted { wallet: wallet() });

        assert_eq!(pair.0.pending, 1);
        assert_eq!(pair.1 .0.len(), 2);
    }
}
