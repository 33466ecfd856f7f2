// Library exports so integration tests can use tinta modules

pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod reactions;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
