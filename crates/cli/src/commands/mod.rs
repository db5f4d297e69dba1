//! Command implementations.

mod info;
mod run;
mod scaffold;
mod validate;

pub use info::run_info;
pub use run::run_suite;
pub use scaffold::{run_init_config, run_init_suite};
pub use validate::run_validate;
