pub mod chat;
pub mod log;
