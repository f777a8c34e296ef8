use std::num::NonZeroU32;

use tokio_util::sync::CancellationToken;

use crate::{
    chain::BridgeChain,
    config::NetworkConfig,
    error::{Cancelled, PipelineError},
    events::{Event, LogLevel, Observer},
    indexer::PacketIndexer,
    pipeline::Pipeline,
    shutdown,
    wallet::{Wallet, WalletEntry},
};

/// Totals of a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub wallets: u32,
    pub skipped: u32,
    pub aborted: u32,
    pub confirmed: u32,
    pub failed: u32,
}

pub struct Orchestrator<'a, I: ?Sized, O> {
    network: &'a NetworkConfig,
    indexer: &'a I,
    observer: O,
    cancel: CancellationToken,
}

impl<'a, I, O> Orchestrator<'a, I, O>
where
    I: PacketIndexer + ?Sized,
    O: Observer,
{
    pub fn new(
        network: &'a NetworkConfig,
        indexer: &'a I,
        observer: O,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            network,
            indexer,
            observer,
            cancel,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.observer.notify(&Event::log(level, message));
    }

    /// Keeps the entries with a usable key. Each rejected entry is reported
    /// and never reaches a chain client.
    pub fn validate(&mut self, entries: &[WalletEntry]) -> (Vec<Wallet>, u32) {
        let mut wallets = Vec::with_capacity(entries.len());
        let mut skipped = 0;

        for entry in entries {
            let name = entry.display_name().to_string();
            if entry.name.as_deref().map_or(true, str::is_empty) {
                self.log(
                    LogLevel::Warn,
                    "Wallet missing 'name' field. Using 'Unnamed' as default.",
                );
            }
            match entry.validate() {
                Ok(signer) => wallets.push(Wallet { name, signer }),
                Err(err) => {
                    skipped += 1;
                    self.log(LogLevel::Warn, format!("Skipping wallet '{name}': {err}."));
                }
            }
        }
        (wallets, skipped)
    }

    /// Reports every wallet's token balance before the run starts.
    pub async fn report_balances<C, F>(
        &mut self,
        wallets: &[Wallet],
        connect: F,
    ) -> Result<(), Cancelled>
    where
        C: BridgeChain,
        F: Fn(&Wallet) -> C,
    {
        for wallet in wallets {
            let chain = connect(wallet);
            let owner = chain.owner();
            let balance = shutdown::guard(chain.balance_of(owner), &self.cancel).await?;
            self.observer.notify(&Event::WalletBalance {
                wallet: wallet.name.clone(),
                address: owner,
                balance: balance.ok(),
                decimals: self.network.asset.decimals,
            });
        }
        Ok(())
    }

    /// Runs the pipeline for each wallet in turn. Per-wallet failures are
    /// reported and the run moves on; only cancellation stops it.
    pub async fn run<C, F>(
        &mut self,
        wallets: &[Wallet],
        skipped: u32,
        max: NonZeroU32,
        connect: F,
    ) -> Result<RunSummary, Cancelled>
    where
        C: BridgeChain,
        F: Fn(&Wallet) -> C,
    {
        let mut summary = RunSummary {
            skipped,
            ..Default::default()
        };

        if wallets.is_empty() {
            self.log(
                LogLevel::Warn,
                "No wallets processed. Check the wallet file for valid entries.",
            );
            return Ok(summary);
        }

        for wallet in wallets {
            if self.cancel.is_cancelled() {
                return Err(Cancelled);
            }
            self.log(
                LogLevel::Loading,
                format!(
                    "Sending {max} transaction(s) Sepolia to Holesky from {}",
                    wallet.name
                ),
            );

            let chain = connect(wallet);
            let outcome =
                Pipeline::new(self.network, self.indexer, &mut self.observer, &self.cancel)
                    .run(&wallet.name, &chain, max)
                    .await;
            summary.wallets += 1;

            match outcome {
                Ok(report) => {
                    summary.confirmed += report.confirmed;
                    summary.failed += report.failed;
                }
                Err(PipelineError::Cancelled(c)) => return Err(c),
                // Already reported by the pipeline.
                Err(PipelineError::Approval(_)) => {
                    summary.aborted += 1;
                    summary.failed += 1;
                }
                Err(err) => {
                    summary.aborted += 1;
                    self.log(LogLevel::Error, format!("{}: {err}", wallet.name));
                }
            }
        }

        self.log(
            LogLevel::Info,
            format!(
                "All transactions completed: {} confirmed, {} failed across {} wallet(s).",
                summary.confirmed, summary.failed, summary.wallets
            ),
        );
        Ok(summary)
    }
}
