//! Scripts for deploying and administering an upgradeable token
//! behind a transparent proxy.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cli;
mod commands;
pub mod constants;
pub mod errors;
pub mod solidity;
pub mod types;
pub mod utils;
