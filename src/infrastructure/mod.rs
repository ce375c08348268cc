pub mod api;
pub mod core;
pub mod persistence;
pub mod symbols;
pub mod yahoo;
