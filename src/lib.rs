// kiroboard - Provision Athena views and QuickSight analytics for Kiro usage reports
//
// The binary in main.rs only parses arguments; command bodies live in
// `commands` so they can be driven from tests and other tools.

pub mod commands;
mod init;

pub use init::{init_tracing, s3_operator, Services};
