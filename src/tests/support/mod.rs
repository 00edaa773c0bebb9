// Test support utilities.

pub mod common;
pub mod upstream;

pub use common::{rows_for, test_config, week_key, week_range};
pub use upstream::{Script, ScriptedClient};
