pub mod chat;
pub mod nms;

pub use chat::handle_chat;
pub use nms::handle_nms;
