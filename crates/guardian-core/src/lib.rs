pub mod config;
pub mod coordinator;
pub mod data;
pub mod engine;
pub mod escalation;
pub mod extract;
pub mod presenter;
pub mod profile;
pub mod protocol;
pub mod rules;
pub mod server;
pub mod store;
pub mod surface;
pub mod url_validate;
pub mod verdict;
