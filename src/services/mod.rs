// TypeAware Core Services

pub mod text_processor;
pub mod config_store;
pub mod detection;
pub mod moderation;
pub mod suggestions;
