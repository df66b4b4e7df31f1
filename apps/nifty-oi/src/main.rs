//! # Nifty OI
//!
//! NSE option-chain open-interest collector: polls the public option-chain
//! API, normalizes snapshots, persists them to append-only logs and serves
//! the latest ranked table as plain JSON.

fn main() -> anyhow::Result<()> {
    nifty_oi_collector::run()
}
