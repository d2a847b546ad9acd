pub mod analyze;
pub mod check;
pub mod config;
pub mod earnings;
pub mod flow;
pub mod record;
