// Library for tests to access modules

pub mod chunk_repo;
pub mod collector_worker;
pub mod config;
pub mod db;
pub mod error;
pub mod insight;
pub mod models;
pub mod record_store;
pub mod routes;
pub mod version;
