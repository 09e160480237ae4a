//! Wire-level protocol layer: AT catalog, frame codec and transport I/O.

pub mod at;
pub mod frame;
pub mod transport;

pub use at::AtCommand;
pub use frame::{checksum, frame_type_name, pack_frame, parse_frame, verify_frame, ApiFrame};
pub use transport::{FrameTransport, TransportConfig};
