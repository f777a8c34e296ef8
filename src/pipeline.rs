use std::{num::NonZeroU32, time::SystemTime};

use alloy::primitives::U256;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    calls::{BridgeCall, TransferOrder},
    chain::BridgeChain,
    config::NetworkConfig,
    error::PipelineError,
    events::{Event, Observer},
    indexer::{poll_packet_hash, PacketIndexer, PollSettings},
    shutdown,
};

/// Outcome of the transfers of one wallet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalletReport {
    pub confirmed: u32,
    pub failed: u32,
    pub packets: u32,
}

/// Drives approve → send → wait → poll for one wallet at a time.
pub struct Pipeline<'a, I: ?Sized, O> {
    network: &'a NetworkConfig,
    indexer: &'a I,
    observer: &'a mut O,
    cancel: &'a CancellationToken,
}

impl<'a, I, O> Pipeline<'a, I, O>
where
    I: PacketIndexer + ?Sized,
    O: Observer,
{
    pub fn new(
        network: &'a NetworkConfig,
        indexer: &'a I,
        observer: &'a mut O,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            network,
            indexer,
            observer,
            cancel,
        }
    }

    fn emit(&mut self, event: Event) {
        self.observer.notify(&event);
    }

    fn poll_settings(&self) -> PollSettings {
        PollSettings {
            retries: self.network.timings.poll_retries,
            interval: self.network.timings.poll_interval,
        }
    }

    /// Sends `max` bridge transfers from the wallet behind `chain`.
    ///
    /// Individual transfer failures are reported and counted; only a missing
    /// balance, a failed approval, a failed read or cancellation end the
    /// wallet early.
    pub async fn run<C: BridgeChain + ?Sized>(
        &mut self,
        wallet: &str,
        chain: &C,
        max: NonZeroU32,
    ) -> Result<WalletReport, PipelineError> {
        self.ensure_allowance(wallet, chain).await?;

        let total = max.get();
        let order = TransferOrder::for_wallet(&self.network.asset, chain.owner());
        let mut report = WalletReport::default();

        for index in 1..=total {
            self.emit(Event::AttemptStarted {
                wallet: wallet.to_string(),
                index,
                total,
            });

            let call = BridgeCall::new(&order, self.network.channel_id, SystemTime::now());
            let started = Instant::now();

            match shutdown::guard(chain.send(call), self.cancel).await? {
                Ok(confirmation) => {
                    report.confirmed += 1;
                    let tx_hash = confirmation.tx_hash;
                    self.emit(Event::AttemptConfirmed {
                        wallet: wallet.to_string(),
                        index,
                        tx_hash,
                        elapsed: started.elapsed(),
                        link: self.network.tx_link(tx_hash),
                    });

                    let settings = self.poll_settings();
                    let packet =
                        poll_packet_hash(self.indexer, &tx_hash.to_string(), settings, self.cancel)
                            .await;
                    if let Some(packet_hash) = packet {
                        report.packets += 1;
                        let link = self.network.packet_link(&packet_hash);
                        self.emit(Event::PacketObserved {
                            wallet: wallet.to_string(),
                            index,
                            packet_hash,
                            link,
                        });
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    self.emit(Event::AttemptFailed {
                        wallet: wallet.to_string(),
                        index,
                        reason: err.to_string(),
                    });
                }
            }

            if index < total {
                shutdown::pause(self.network.timings.between_transactions, self.cancel).await?;
            }
        }

        self.emit(Event::WalletFinished {
            wallet: wallet.to_string(),
            confirmed: report.confirmed,
            failed: report.failed,
        });
        Ok(report)
    }

    /// Checks the balance and approves the bridge once when the allowance is
    /// zero.
    async fn ensure_allowance<C: BridgeChain + ?Sized>(
        &mut self,
        wallet: &str,
        chain: &C,
    ) -> Result<(), PipelineError> {
        let owner = chain.owner();
        let spender = chain.bridge();

        let balance = shutdown::guard(chain.balance_of(owner), self.cancel).await??;
        if balance.is_zero() {
            return Err(PipelineError::Funds(owner));
        }

        let allowance = shutdown::guard(chain.allowance(owner, spender), self.cancel).await??;
        if !allowance.is_zero() {
            return Ok(());
        }

        self.emit(Event::ApprovalSubmitted {
            wallet: wallet.to_string(),
        });
        match shutdown::guard(chain.approve(spender, U256::MAX), self.cancel).await? {
            Ok(confirmation) => {
                self.emit(Event::ApprovalConfirmed {
                    wallet: wallet.to_string(),
                    tx_hash: confirmation.tx_hash,
                    link: self.network.tx_link(confirmation.tx_hash),
                });
                shutdown::pause(self.network.timings.after_approval, self.cancel).await?;
                Ok(())
            }
            Err(err) => {
                self.emit(Event::ApprovalFailed {
                    wallet: wallet.to_string(),
                    reason: err.to_string(),
                });
                Err(PipelineError::Approval(err))
            }
        }
    }
}
