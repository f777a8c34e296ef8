//! Repeated USDC transfers from Sepolia to Holesky through Union's UCS03
//! entrypoint, one wallet and one transaction at a time.

pub mod bindings;
pub mod calls;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod indexer;
pub mod orchestrator;
pub mod pipeline;
pub mod pool;
pub mod shutdown;
pub mod wallet;

#[cfg(test)]
mod testing;
