#[macro_use]
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod apportion;
pub mod chain;
pub mod config;
pub mod distribution;
pub mod doctor;
pub mod error;
pub mod merkle;
pub mod proof_cli;
pub mod publish;
pub mod recipients;
pub mod reconcile;
pub mod store;
