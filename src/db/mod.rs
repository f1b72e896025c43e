pub mod attractions;
pub mod postgres;
pub mod ratings;
pub mod redis;
