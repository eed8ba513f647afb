use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use crate::interface::NetworkInterface;
use crate::ipv4::Ipv4Datagram;

struct RouteEntry {
	prefix: Ipv4Addr,
	prefix_length: u8,
	next_hop: Option<Ipv4Addr>,
	interface_index: usize,
}

fn matches(prefix: Ipv4Addr, prefix_length: u8, addr: Ipv4Addr) -> bool {
	if prefix_length == 0 {
		return true;
	}

	let mask = u32::MAX << (32 - prefix_length as u32);
	u32::from(prefix) & mask == u32::from(addr) & mask
}

/// Forwards IPv4 datagrams across a set of network interfaces by longest-prefix match.
pub struct Router {
	interfaces: Vec<Rc<RefCell<NetworkInterface>>>,
	routes: Vec<RouteEntry>,
}

impl Default for Router {
	fn default() -> Self {
		Self::new()
	}
}

impl Router {
	#[must_use]
	pub fn new() -> Self {
		Self { interfaces: Vec::new(), routes: Vec::new() }
	}

	pub fn add_interface(&mut self, interface: Rc<RefCell<NetworkInterface>>) -> usize {
		self.interfaces.push(interface);
		self.interfaces.len() - 1
	}

	pub fn add_route(&mut self, prefix: Ipv4Addr, prefix_length: u8, next_hop: Option<Ipv4Addr>, interface_index: usize) {
		self.routes.push(RouteEntry { prefix, prefix_length, next_hop, interface_index });
	}

	/// Routes one datagram: picks the most specific matching route, decrements TTL,
	/// recomputes the checksum, and hands it to the selected interface.
	pub fn route_one_dgram(&mut self, dgram: Ipv4Datagram) {
		let dst = dgram.header.dst;

		let best = self
			.routes
			.iter()
			.filter(|r| matches(r.prefix, r.prefix_length, dst))
			.max_by_key(|r| r.prefix_length);

		let Some(best) = best else {
			log::debug!("no matching route for {dst}");
			return;
		};

		if dgram.header.ttl <= 1 {
			log::debug!("dropping datagram with expired ttl");
			return;
		}

		let next_hop = best.next_hop.unwrap_or(dst);
		let interface_index = best.interface_index;

		let mut dgram = dgram;
		dgram.header.ttl -= 1;
		dgram.header.checksum = dgram.header.compute_checksum();

		self.interfaces[interface_index].borrow_mut().send_datagram(dgram, next_hop);
	}

	/// Drains every interface's received-datagram queue, routing each in arrival order.
	pub fn route(&mut self) {
		for i in 0..self.interfaces.len() {
			loop {
				let Some(dgram) = self.interfaces[i].borrow_mut().pop_received() else { break };
				self.route_one_dgram(dgram);
			}
		}
	}
}
