//! CLI subcommands.

use marketplace_cart::CartError;
use thiserror::Error;

pub mod cart;

/// Errors a command can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The cart store rejected the operation or could not persist it.
    #[error("{0}")]
    Cart(#[from] CartError),
}
