use std::{io::Write, process::ExitCode, sync::Arc};

use alloy::transports::http::{Client, Http};
use clap::Parser;
use eyre::WrapErr;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use union_bridger::{
    chain::{self, ChainClient},
    config::{self, Args},
    error::Cancelled,
    events::{Dashboard, TracingObserver},
    indexer::GraphQlIndexer,
    orchestrator::Orchestrator,
    pool::RpcPool,
    shutdown,
    wallet::{self, Wallet},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cancel = CancellationToken::new();
    shutdown::cancel_on_ctrl_c(cancel.clone());

    match run(&args, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.downcast_ref::<Cancelled>().is_some() => {
            info!("stopped by operator");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            // Leave the last lines on screen before exiting.
            tokio::time::sleep(args.exit_delay()).await;
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, cancel: CancellationToken) -> eyre::Result<()> {
    let network = args.network_config()?;
    let entries = wallet::load(&args.wallets)?;

    let pool = Arc::new(RpcPool::new(network.rpc_urls.clone())?);
    let indexer =
        GraphQlIndexer::new(network.graphql_url.clone()).wrap_err("building indexer client")?;
    info!(
        endpoints = pool.len(),
        bridge = %network.bridge,
        token = %network.asset.base_token,
        "loaded {} wallet entries",
        entries.len()
    );

    let connect = |wallet: &Wallet| {
        ChainClient::<_, Http<Client>>::new(
            chain::connect(&pool, wallet.signer.clone()),
            pool.clone(),
            wallet.signer.address(),
            network.asset.base_token,
            network.bridge,
        )
    };

    let observer = (Dashboard::default(), TracingObserver);
    let mut orchestrator = Orchestrator::new(&network, &indexer, observer, cancel.clone());

    let (wallets, skipped) = orchestrator.validate(&entries);
    orchestrator.report_balances(&wallets, &connect).await?;

    let max = match args.transactions {
        Some(n) => n,
        None => {
            print!("Enter the number of transactions per wallet: ");
            std::io::stdout().flush()?;
            let mut stdin = BufReader::new(tokio::io::stdin());
            shutdown::guard(config::read_transaction_count(&mut stdin), &cancel).await??
        }
    };

    let summary = orchestrator.run(&wallets, skipped, max, &connect).await?;
    let snapshot = orchestrator.observer().0.stats().snapshot();
    info!(
        wallets = summary.wallets,
        skipped = summary.skipped,
        aborted = summary.aborted,
        success = snapshot.success,
        failed = snapshot.failed,
        last_latency_ms = snapshot.last_latency.map(|d| d.as_millis() as u64),
        "run finished"
    );
    Ok(())
}
