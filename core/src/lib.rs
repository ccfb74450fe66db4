pub mod archive;
pub mod checks;
pub mod cipher;
pub mod config;
pub mod event;
pub mod hashing;
pub mod identifiers;
pub mod naming;
pub mod pipeline;
pub mod submission;

pub mod error;
