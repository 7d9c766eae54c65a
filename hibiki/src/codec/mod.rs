pub mod codec;
pub mod hf;
