pub mod arp;
pub mod bytestream;
pub mod checksum;
pub mod ethernet;
pub mod interface;
pub mod ipv4;
pub mod reassembler;
pub mod router;
pub mod tcp;
pub mod wrap32;

pub use bytestream::ByteStream;
pub use reassembler::Reassembler;
pub use wrap32::Wrap32;
