use std::fmt;

/// A 6-byte Ethernet (MAC) address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EthernetAddress(pub [u8; 6]);

impl EthernetAddress {
	pub const BROADCAST: Self = Self([0xff; 6]);
}

impl fmt::Display for EthernetAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [a, b, c, d, e, g] = self.0;
		write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EtherType {
	Ipv4,
	Arp,
}

#[derive(Clone, Debug)]
pub struct EthernetHeader {
	pub src: EthernetAddress,
	pub dst: EthernetAddress,
	pub ethertype: EtherType,
}

/// The unit the network interface sends and receives: a header plus an opaque payload
/// that is either a serialized [`crate::ipv4::Ipv4Datagram`] or [`crate::arp::ArpMessage`].
#[derive(Clone, Debug)]
pub struct EthernetFrame {
	pub header: EthernetHeader,
	pub payload: Vec<u8>,
}
