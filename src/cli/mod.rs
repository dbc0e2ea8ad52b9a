//! CLI commands

pub mod context;
pub mod evaluate;
pub mod status;
pub mod style;

pub use evaluate::run_evaluate;
pub use status::run_status;
