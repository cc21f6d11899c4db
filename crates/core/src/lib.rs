mod assets;

pub mod adapter;
pub mod config;
pub mod entitlement;
pub mod prompt;
pub mod quota;
pub mod reply;
pub mod session;
pub mod store;

pub use crate::adapter::get_reply_service;
pub use crate::assets::{get_config_dir, get_data_dir};
