pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod personas;
pub mod serve;
