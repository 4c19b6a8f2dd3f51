//! API Controller modules

pub mod health;
pub mod subscription;
