//! # Services Module
//!
//! Clients for the external collaborators: the Jupiter aggregator and the
//! Solana ledger.

pub mod jupiter;
pub mod ledger;

pub use jupiter::{JupiterClient, SwapService};
pub use ledger::{Ledger, SolanaLedger};
