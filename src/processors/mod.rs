// pixconvert/src/processors/mod.rs
mod batch;
mod decoder;
mod encoder;
pub mod orientation;
mod resizer;

pub use batch::{BatchConverter, CancelToken};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use resizer::Resizer;

