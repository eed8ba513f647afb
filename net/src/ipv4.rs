use std::net::Ipv4Addr;

use crate::checksum::Checksum;

/// A minimal IPv4 header: only the fields the core actually reads or mutates.
#[derive(Clone, Copy, Debug)]
pub struct Ipv4Header {
	pub src: Ipv4Addr,
	pub dst: Ipv4Addr,
	pub ttl: u8,
	pub protocol: u8,
	pub length: u16,
	pub identification: u16,
	pub checksum: u16,
}

impl Ipv4Header {
	#[must_use]
	pub fn new(src: Ipv4Addr, dst: Ipv4Addr, ttl: u8, protocol: u8, payload_len: u16) -> Self {
		let mut header = Self { src, dst, ttl, protocol, length: HEADER_LEN as u16 + payload_len, identification: 0, checksum: 0 };
		header.checksum = header.compute_checksum();
		header
	}

	/// Recomputes the header checksum over every field except the checksum itself.
	#[must_use]
	pub fn compute_checksum(&self) -> u16 {
		let mut csum = Checksum::default();

		csum.push(&[0x45, 0x00]);
		csum.push(&self.length.to_be_bytes());
		csum.push(&self.identification.to_be_bytes());
		csum.push(&[0x00, 0x00]);
		csum.push(&[self.ttl, self.protocol]);
		csum.push(&self.src.octets());
		csum.push(&self.dst.octets());

		u16::from_be_bytes(csum.end())
	}
}

/// A header paired with an opaque, already-serialized payload.
#[derive(Clone, Debug)]
pub struct Ipv4Datagram {
	pub header: Ipv4Header,
	pub payload: Vec<u8>,
}

impl Ipv4Datagram {
	#[must_use]
	pub fn serialize(&self) -> Vec<u8> {
		let h = &self.header;
		let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());

		out.push(0x45);
		out.push(0x00);
		out.extend_from_slice(&h.length.to_be_bytes());
		out.extend_from_slice(&h.identification.to_be_bytes());
		out.extend_from_slice(&[0x00, 0x00]);
		out.push(h.ttl);
		out.push(h.protocol);
		out.extend_from_slice(&h.checksum.to_be_bytes());
		out.extend_from_slice(&h.src.octets());
		out.extend_from_slice(&h.dst.octets());
		out.extend_from_slice(&self.payload);

		out
	}

	#[must_use]
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		if bytes.len() < HEADER_LEN {
			return None;
		}

		let length = u16::from_be_bytes([bytes[2], bytes[3]]);
		let identification = u16::from_be_bytes([bytes[4], bytes[5]]);
		let ttl = bytes[8];
		let protocol = bytes[9];
		let checksum = u16::from_be_bytes([bytes[10], bytes[11]]);
		let src = Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]);
		let dst = Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]);

		Some(Self { header: Ipv4Header { src, dst, ttl, protocol, length, identification, checksum }, payload: bytes[HEADER_LEN..].to_vec() })
	}
}

/// Version 4 + IHL 5 (no options), the only shape this core ever produces.
pub const HEADER_LEN: usize = 20;
