//! Device-I/O backends.

mod emu;
mod null;

pub use emu::Emu;
pub use null::Null;
