pub mod types;
pub mod multipliers;
pub mod validation;
pub mod heuristic;
pub mod service;
