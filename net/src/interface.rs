use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;

use utils::error::ExtOpaque;

use crate::arp::{ArpMessage, ArpOpcode};
use crate::ethernet::{EtherType, EthernetAddress, EthernetFrame, EthernetHeader};
use crate::ipv4::Ipv4Datagram;

/// How long a learned ARP mapping, and a pending ARP request, stay valid.
#[derive(Clone, Copy, Debug)]
pub struct ArpTimers {
	pub entry_ttl_ms: i64,
	pub response_ttl_ms: i64,
}

impl Default for ArpTimers {
	fn default() -> Self {
		Self { entry_ttl_ms: 30_000, response_ttl_ms: 5_000 }
	}
}

/// Where a network interface hands off frames it wants to transmit.
pub trait OutputPort {
	fn transmit(&mut self, frame: EthernetFrame);
}

/// Ethernet + ARP encapsulation for one IPv4 address on one link.
pub struct NetworkInterface {
	ethernet_address: EthernetAddress,
	ip_address: Ipv4Addr,
	output: Box<dyn OutputPort>,
	timers: ArpTimers,

	arp_cache: HashMap<Ipv4Addr, (EthernetAddress, i64)>,
	pending_arp_requests: HashMap<Ipv4Addr, i64>,
	pending_datagrams: HashMap<Ipv4Addr, Vec<(Ipv4Addr, Ipv4Datagram)>>,
	datagrams_received: VecDeque<Ipv4Datagram>,
}

impl NetworkInterface {
	#[must_use]
	pub fn new(ethernet_address: EthernetAddress, ip_address: Ipv4Addr, output: Box<dyn OutputPort>, timers: ArpTimers) -> Self {
		Self {
			ethernet_address,
			ip_address,
			output,
			timers,
			arp_cache: HashMap::new(),
			pending_arp_requests: HashMap::new(),
			pending_datagrams: HashMap::new(),
			datagrams_received: VecDeque::new(),
		}
	}

	#[must_use]
	pub fn ethernet_address(&self) -> EthernetAddress {
		self.ethernet_address
	}

	#[must_use]
	pub fn ip_address(&self) -> Ipv4Addr {
		self.ip_address
	}

	/// Pops the next datagram this interface has received and accepted, if any.
	pub fn pop_received(&mut self) -> Option<Ipv4Datagram> {
		self.datagrams_received.pop_front()
	}

	fn transmit_ipv4(&mut self, dst: EthernetAddress, dgram: &Ipv4Datagram) {
		let header = EthernetHeader { src: self.ethernet_address, dst, ethertype: EtherType::Ipv4 };
		self.output.transmit(EthernetFrame { header, payload: dgram.serialize() });
	}

	fn transmit_arp(&mut self, dst: EthernetAddress, msg: &ArpMessage) {
		let header = EthernetHeader { src: self.ethernet_address, dst, ethertype: EtherType::Arp };
		self.output.transmit(EthernetFrame { header, payload: msg.serialize() });
	}

	/// Sends `dgram` to `next_hop`, resolving its MAC address via ARP if necessary.
	pub fn send_datagram(&mut self, dgram: Ipv4Datagram, next_hop: Ipv4Addr) {
		if let Some(&(mac, _)) = self.arp_cache.get(&next_hop) {
			self.transmit_ipv4(mac, &dgram);
			return;
		}

		self.pending_datagrams.entry(next_hop).or_default().push((next_hop, dgram));

		if !self.pending_arp_requests.contains_key(&next_hop) {
			let request = ArpMessage::request(self.ethernet_address, self.ip_address, next_hop);
			self.transmit_arp(EthernetAddress::BROADCAST, &request);
			self.pending_arp_requests.insert(next_hop, self.timers.response_ttl_ms);
		}
	}

	/// Processes an inbound frame; drops it unless addressed to us or to the broadcast MAC.
	pub fn recv_frame(&mut self, frame: EthernetFrame) {
		if frame.header.dst != EthernetAddress::BROADCAST && frame.header.dst != self.ethernet_address {
			return;
		}

		match frame.header.ethertype {
			EtherType::Ipv4 => {
				if let Some(dgram) = Ipv4Datagram::parse(&frame.payload).some_or(|| log::warn!("dropping unparseable IPv4 payload")) {
					self.datagrams_received.push_back(dgram);
				}
			}
			EtherType::Arp => {
				if let Some(msg) = ArpMessage::parse(&frame.payload).some_or(|| log::warn!("dropping unparseable ARP payload")) {
					self.handle_arp(msg);
				}
			}
		}
	}

	fn handle_arp(&mut self, msg: ArpMessage) {
		if msg.opcode == ArpOpcode::Request && msg.target_ip == self.ip_address {
			let reply = ArpMessage::reply(self.ethernet_address, self.ip_address, msg.sender_mac, msg.sender_ip);
			self.transmit_arp(msg.sender_mac, &reply);
		}

		self.arp_cache.insert(msg.sender_ip, (msg.sender_mac, self.timers.entry_ttl_ms));

		if let Some(queued) = self.pending_datagrams.remove(&msg.sender_ip) {
			for (_, dgram) in queued {
				self.transmit_ipv4(msg.sender_mac, &dgram);
			}
		}
	}

	/// Ages out ARP cache entries and abandoned pending requests.
	pub fn tick(&mut self, ms_since_last_tick: u64) {
		let ms = ms_since_last_tick as i64;

		self.arp_cache.retain(|_, (_, ttl)| {
			*ttl -= ms;
			*ttl > 0
		});

		self.pending_arp_requests.retain(|ip, ttl| {
			*ttl -= ms;
			let alive = *ttl > 0;
			if !alive {
				self.pending_datagrams.remove(ip);
			}
			alive
		});
	}
}
