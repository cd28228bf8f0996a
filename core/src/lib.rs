//! cosmic-core: offline-first game and sync core for the Cosmic Clicker.
//!
//! Layering, bottom up:
//!   store      SQLite key-value persistence (the only module issuing SQL)
//!   cache      per-identity profile cache + session slot on top of store
//!   remote     authoritative profile store (HTTP or in-process)
//!   reconcile  login protocol, background push, leaderboard
//!   economy    pure gameplay transitions
//!   game       a running session: state, tasks, actions
//!   app        one-session-at-a-time facade and command dispatch

pub mod app;
pub mod bonus;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod context;
pub mod economy;
pub mod error;
pub mod game;
pub mod profile;
pub mod reconcile;
pub mod remote;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod tasks;
pub mod types;
