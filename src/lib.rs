//! i2cniff classifies I2C bus captures from an undocumented controller network.
//! Every exchange is scored by how well it matches what the same address did before,
//! so routine polling fades into the background and anything new stands out.
pub mod analyser;
pub mod ui;

pub use analyser::assembler::PacketAssembler;
pub use analyser::containers::{ByteRow, Confidence, Message, Packet};
pub use analyser::core::ExpectationModel;
pub use analyser::error::CaptureError;
