use std::net::Ipv4Addr;

use crate::ethernet::EthernetAddress;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArpOpcode {
	Request,
	Reply,
}

/// An IPv4-only ARP message (the IPv6/ARP-over-other-protocols cases are not modeled).
#[derive(Clone, Debug)]
pub struct ArpMessage {
	pub opcode: ArpOpcode,
	pub sender_mac: EthernetAddress,
	pub sender_ip: Ipv4Addr,
	pub target_mac: EthernetAddress,
	pub target_ip: Ipv4Addr,
}

impl ArpMessage {
	#[must_use]
	pub fn request(sender_mac: EthernetAddress, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
		Self { opcode: ArpOpcode::Request, sender_mac, sender_ip, target_mac: EthernetAddress([0; 6]), target_ip }
	}

	#[must_use]
	pub fn reply(sender_mac: EthernetAddress, sender_ip: Ipv4Addr, target_mac: EthernetAddress, target_ip: Ipv4Addr) -> Self {
		Self { opcode: ArpOpcode::Reply, sender_mac, sender_ip, target_mac, target_ip }
	}

	#[must_use]
	pub fn serialize(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(21);

		out.push(match self.opcode {
			ArpOpcode::Request => 1,
			ArpOpcode::Reply => 2,
		});
		out.extend_from_slice(&self.sender_mac.0);
		out.extend_from_slice(&self.sender_ip.octets());
		out.extend_from_slice(&self.target_mac.0);
		out.extend_from_slice(&self.target_ip.octets());

		out
	}

	#[must_use]
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		if bytes.len() < 21 {
			return None;
		}

		let opcode = match bytes[0] {
			1 => ArpOpcode::Request,
			2 => ArpOpcode::Reply,
			_ => return None,
		};

		let sender_mac = EthernetAddress(bytes[1..7].try_into().unwrap());
		let sender_ip = Ipv4Addr::new(bytes[7], bytes[8], bytes[9], bytes[10]);
		let target_mac = EthernetAddress(bytes[11..17].try_into().unwrap());
		let target_ip = Ipv4Addr::new(bytes[17], bytes[18], bytes[19], bytes[20]);

		Some(Self { opcode, sender_mac, sender_ip, target_mac, target_ip })
	}
}
