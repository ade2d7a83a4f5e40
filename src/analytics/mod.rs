pub mod trends;
pub mod comparison;
pub mod map;
