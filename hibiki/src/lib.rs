#[cfg(test)]
#[macro_use]
extern crate is_close;

pub mod array;
pub use array::Array;

pub mod data_type;
pub use data_type::{ArrayElement, DataType};

pub mod cancellation;
pub use cancellation::CancellationToken;

pub mod codec;
pub mod detection;
pub mod executor;
pub mod generator;
pub mod session;
