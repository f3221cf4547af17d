pub mod apply;
pub mod config;
pub mod render;
pub mod steps;
