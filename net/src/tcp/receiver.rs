use super::segment::{TcpReceiverMessage, TcpSenderMessage};
use crate::bytestream::ByteStream;
use crate::reassembler::Reassembler;
use crate::wrap32::Wrap32;

/// Translates incoming wire segments into [`Reassembler`] writes, and produces
/// acknowledgments with flow-control windows for the peer's sender.
pub struct TcpReceiver {
	reassembler: Reassembler,
	isn: Option<Wrap32>,
}

impl TcpReceiver {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self { reassembler: Reassembler::new(ByteStream::new(capacity)), isn: None }
	}

	#[must_use]
	pub fn reassembler(&mut self) -> &mut Reassembler {
		&mut self.reassembler
	}

	/// Consumes a segment from the peer's sender.
	///
	/// On RST, marks the output stream errored and returns; later non-RST segments
	/// are still parsed and still update the reassembler.
	pub fn receive(&mut self, message: TcpSenderMessage) {
		if message.rst {
			log::warn!("peer reset the connection");
			self.reassembler.output().set_error();
			return;
		}

		if self.isn.is_none() {
			if !message.syn {
				log::debug!("dropping segment before SYN has been observed");
				return;
			}

			self.isn = Some(message.seqno);
		}

		let isn = self.isn.expect("just set above if it was missing");
		self.ingest(isn, message.seqno, message.syn, &message.payload, message.fin);
	}

	fn ingest(&mut self, isn: Wrap32, seqno: Wrap32, syn: bool, payload: &[u8], fin: bool) {
		let checkpoint = self.reassembler.output().writer().bytes_pushed() + 1;
		let abs_seqno = seqno.unwrap(isn, checkpoint);
		// `abs_seqno` is 0 for the SYN segment itself; the `-1 + syn` cancels out
		// to 0 in that case, so this must wrap rather than panic on underflow.
		let stream_index = abs_seqno.wrapping_sub(1).wrapping_add(syn as u64);

		self.reassembler.insert(stream_index, payload, fin);
	}

	/// The next sequence number the receiver expects, or `None` before any SYN has arrived.
	#[must_use]
	pub fn ackno(&mut self) -> Option<Wrap32> {
		let isn = self.isn?;

		let mut abs_ackno = self.reassembler.output().writer().bytes_pushed() + 1;
		if self.reassembler.output().writer().is_closed() {
			abs_ackno += 1;
		}

		Some(Wrap32::wrap(abs_ackno, isn))
	}

	/// Builds the [`TcpReceiverMessage`] to send back to the peer's sender.
	#[must_use]
	pub fn send(&mut self) -> TcpReceiverMessage {
		let window_size = self.reassembler.output().writer().available_capacity().min(u16::MAX as usize) as u16;
		let rst = self.reassembler.output().has_error();
		let ackno = self.ackno();

		TcpReceiverMessage { ackno, window_size, rst }
	}
}

#[cfg(test)]
mod tests {
	use super::TcpReceiver;
	use crate::tcp::segment::TcpSenderMessage;
	use crate::wrap32::Wrap32;

	fn msg(seqno: u32, syn: bool, payload: &[u8], fin: bool, rst: bool) -> TcpSenderMessage {
		TcpSenderMessage { seqno: Wrap32::new(seqno), syn, payload: payload.to_vec(), fin, rst }
	}

	#[test]
	fn drops_everything_before_the_first_syn() {
		let mut r = TcpReceiver::new(64);
		assert_eq!(r.ackno(), None);

		r.receive(msg(5, false, b"hello", false, false));
		assert_eq!(r.ackno(), None);
	}

	#[test]
	fn syn_then_payload_then_fin_advances_ackno() {
		let mut r = TcpReceiver::new(64);

		r.receive(msg(100, true, b"", false, false));
		assert_eq!(r.ackno(), Some(Wrap32::new(101)));

		r.receive(msg(101, false, b"hello", false, false));
		assert_eq!(r.ackno(), Some(Wrap32::new(106)));
		assert_eq!(r.reassembler().output().reader().peek(), b"hello");

		r.receive(msg(106, false, b"", true, false));
		assert_eq!(r.ackno(), Some(Wrap32::new(107)));
		assert!(r.reassembler().output().writer().is_closed());

		r.reassembler().output().reader().pop(5);
		assert!(r.reassembler().output().reader().is_finished());
	}

	#[test]
	fn rst_sets_error_and_subsequent_segments_still_update_the_reassembler() {
		let mut r = TcpReceiver::new(64);
		r.receive(msg(100, true, b"", false, false));

		r.receive(msg(101, false, b"", false, true));
		assert!(r.reassembler().output().has_error());

		r.receive(msg(101, false, b"hi", false, false));
		assert_eq!(r.reassembler().output().reader().peek(), b"hi");
	}

	#[test]
	fn window_size_is_capped_at_u16_max() {
		let mut r = TcpReceiver::new(1 << 20);
		r.receive(msg(1, true, b"", false, false));

		let out = r.send();
		assert_eq!(out.window_size, u16::MAX);
		assert!(!out.rst);
	}

	#[test]
	fn ackno_is_monotonically_non_decreasing() {
		let mut r = TcpReceiver::new(64);
		r.receive(msg(0, true, b"", false, false));
		let mut last = r.ackno().unwrap().raw_value();

		for (seqno, data) in [(1u32, &b"ab"[..]), (3, &b"cd"[..]), (5, &b"ef"[..])] {
			r.receive(msg(seqno, false, data, false, false));
			let next = r.ackno().unwrap().raw_value();
			assert!(next.wrapping_sub(last) <= i32::MAX as u32);
			last = next;
		}
	}
}
