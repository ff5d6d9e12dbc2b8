pub mod access;
pub mod actors;
pub mod claims;
pub mod config;
pub mod engine;
pub mod error;
pub mod repository;
pub mod tick;
pub mod visualiser;
pub mod world;
