pub mod block;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod event;
pub mod event_bus;
pub mod permissions;
pub mod persistence;
pub mod player_registry;
pub mod rules;
pub mod service;
