pub mod compact;
pub mod config_cmd;
pub mod feed;
pub mod rank;
