use std::collections::VecDeque;

use super::segment::{TcpReceiverMessage, TcpSenderMessage, MAX_PAYLOAD_SIZE};
use crate::bytestream::{read, ByteStream};
use crate::wrap32::Wrap32;

/// The sender-relevant reduction of the classic TCP state machine: this core never
/// distinguishes `Listen`/`SynReceived`/the various close substates, since it always
/// initiates (never passively accepts) a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SenderState {
	Closed,
	Established,
	FinSent,
	FinAcked,
	Error,
}

/// Converts outbound stream bytes into wire segments, tracking outstanding bytes,
/// retransmissions, and RTO back-off. Obeys only the peer-advertised window; there
/// is no congestion control.
pub struct TcpSender {
	input: ByteStream,
	isn: Wrap32,
	initial_rto_ms: u64,
	cur_rto_ms: i64,

	timer_running: bool,
	abs_seqno: u64,
	outstanding_bytes: u64,
	outstanding: VecDeque<TcpSenderMessage>,

	window_size: u16,
	zero_window: bool,
	consecutive_retransmissions: u32,

	syn_sent: bool,
	fin_sent: bool,
	fin_acked: bool,
}

impl TcpSender {
	#[must_use]
	pub fn new(input: ByteStream, isn: Wrap32, initial_rto_ms: u64) -> Self {
		Self {
			input,
			isn,
			initial_rto_ms,
			cur_rto_ms: initial_rto_ms as i64,
			timer_running: false,
			abs_seqno: 0,
			outstanding_bytes: 0,
			outstanding: VecDeque::new(),
			window_size: 1,
			zero_window: false,
			consecutive_retransmissions: 0,
			syn_sent: false,
			fin_sent: false,
			fin_acked: false,
		}
	}

	#[must_use]
	pub fn writer(&mut self) -> crate::bytestream::Writer<'_> {
		self.input.writer()
	}

	#[must_use]
	pub fn reader(&mut self) -> crate::bytestream::Reader<'_> {
		self.input.reader()
	}

	#[must_use]
	pub fn sequence_numbers_in_flight(&self) -> u64 {
		self.outstanding_bytes
	}

	#[must_use]
	pub fn consecutive_retransmissions(&self) -> u32 {
		self.consecutive_retransmissions
	}

	#[must_use]
	pub fn state(&self) -> SenderState {
		if self.input.has_error() {
			return SenderState::Error;
		}
		if self.fin_acked {
			SenderState::FinAcked
		} else if self.fin_sent {
			SenderState::FinSent
		} else if self.syn_sent {
			SenderState::Established
		} else {
			SenderState::Closed
		}
	}

	/// Fills the advertised window with as many segments as it allows.
	pub fn push(&mut self, mut transmit: impl FnMut(&TcpSenderMessage)) {
		loop {
			let window = self.window_size.max(1) as u64;
			if self.outstanding_bytes >= window {
				break;
			}

			let mut msg =
				TcpSenderMessage { seqno: Wrap32::wrap(self.abs_seqno, self.isn), syn: false, payload: Vec::new(), fin: false, rst: false };

			if self.input.has_error() {
				msg.rst = true;
			}

			if !self.syn_sent {
				self.syn_sent = true;
				msg.syn = true;
				msg.seqno = self.isn;
			}

			let len = ((window - self.outstanding_bytes) as usize).min(MAX_PAYLOAD_SIZE).min(self.input.reader().bytes_buffered());

			read(&mut self.input.reader(), len, &mut msg.payload);

			if self.input.reader().is_finished() && !self.fin_sent && msg.sequence_length() + self.outstanding_bytes < window {
				self.fin_sent = true;
				msg.fin = true;
			}

			if msg.sequence_length() == 0 {
				break;
			}

			self.abs_seqno += msg.sequence_length();
			self.outstanding_bytes += msg.sequence_length();
			self.outstanding.push_back(msg.clone());

			transmit(&msg);

			if !self.timer_running {
				self.timer_running = true;
			}
		}
	}

	/// Processes a status update from the peer's receiver.
	pub fn receive(&mut self, message: TcpReceiverMessage) {
		if message.rst {
			log::warn!("peer reset the connection");
			self.input.set_error();
		}

		self.zero_window = message.window_size == 0;
		self.window_size = if self.zero_window { 1 } else { message.window_size };

		let Some(ackno) = message.ackno else { return };

		if ackno.unwrap(self.isn, self.abs_seqno) > self.abs_seqno {
			log::debug!("ignoring ack of unsent data");
			return;
		}

		let mut acknowledged_anything = false;

		while let Some(front) = self.outstanding.front() {
			let front_end = front.seqno.unwrap(self.isn, self.abs_seqno) + front.sequence_length();
			if front_end > ackno.unwrap(self.isn, self.abs_seqno) {
				break;
			}

			let front = self.outstanding.pop_front().expect("checked Some above");
			self.outstanding_bytes -= front.sequence_length();

			if front.fin {
				self.fin_acked = true;
			}

			acknowledged_anything = true;
		}

		if acknowledged_anything {
			self.consecutive_retransmissions = 0;
			self.cur_rto_ms = self.initial_rto_ms as i64;

			self.timer_running = self.outstanding_bytes != 0;
		}
	}

	/// Advances the retransmission timer; retransmits the oldest outstanding segment
	/// at most once per call once the timer expires.
	pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&TcpSenderMessage)) {
		if self.timer_running {
			self.cur_rto_ms -= ms_since_last_tick as i64;
		}

		if self.cur_rto_ms <= 0 {
			if let Some(oldest) = self.outstanding.front() {
				transmit(oldest);
				self.consecutive_retransmissions += 1;

				self.cur_rto_ms = if self.zero_window {
					self.initial_rto_ms as i64
				} else {
					(self.initial_rto_ms as i64).saturating_mul(1i64 << self.consecutive_retransmissions.min(32))
				};
			}
		}
	}

	/// A zero-length segment carrying only the current sequence number and RST state.
	#[must_use]
	pub fn make_empty_message(&self) -> TcpSenderMessage {
		TcpSenderMessage { seqno: Wrap32::wrap(self.abs_seqno, self.isn), syn: false, payload: Vec::new(), fin: false, rst: self.input.has_error() }
	}
}

#[cfg(test)]
mod tests {
	use super::TcpSender;
	use crate::bytestream::ByteStream;
	use crate::tcp::segment::TcpReceiverMessage;
	use crate::wrap32::Wrap32;

	fn recv_msg(ackno: Option<u32>, window_size: u16) -> TcpReceiverMessage {
		TcpReceiverMessage { ackno: ackno.map(Wrap32::new), window_size, rst: false }
	}

	#[test]
	fn syn_then_fin_once_window_allows_it() {
		let mut input = ByteStream::new(64);
		input.writer().close();

		let mut sender = TcpSender::new(input, Wrap32::new(0), 1000);

		sender.receive(recv_msg(None, 1));

		let mut sent = Vec::new();
		sender.push(|msg| sent.push(msg.clone()));

		assert_eq!(sent.len(), 1);
		assert!(sent[0].syn);
		assert!(!sent[0].fin);
		assert_eq!(sent[0].sequence_length(), 1);

		sender.receive(recv_msg(Some(1), 1));

		let mut sent = Vec::new();
		sender.push(|msg| sent.push(msg.clone()));

		assert_eq!(sent.len(), 1);
		assert!(!sent[0].syn);
		assert!(sent[0].fin);
		assert_eq!(sent[0].sequence_length(), 1);
	}

	#[test]
	fn retransmission_backs_off_exponentially_then_resets_on_ack() {
		let input = ByteStream::new(64);
		let mut sender = TcpSender::new(input, Wrap32::new(0), 1000);

		// Establish the connection first so the segment under test carries no SYN.
		sender.receive(recv_msg(None, 4));
		sender.push(|_| {});
		sender.receive(recv_msg(Some(1), 4));

		sender.writer().push(b"abcd");

		let mut sent = Vec::new();
		sender.push(|msg| sent.push(msg.clone()));
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].sequence_length(), 4);

		let mut retransmits = Vec::new();
		sender.tick(1000, |msg| retransmits.push(msg.clone()));
		assert_eq!(retransmits.len(), 1);
		assert_eq!(sender.consecutive_retransmissions(), 1);

		retransmits.clear();
		sender.tick(2000, |msg| retransmits.push(msg.clone()));
		assert_eq!(retransmits.len(), 1);
		assert_eq!(sender.consecutive_retransmissions(), 2);

		sender.receive(recv_msg(Some(5), 4));
		assert_eq!(sender.consecutive_retransmissions(), 0);
		assert_eq!(sender.sequence_numbers_in_flight(), 0);
	}

	#[test]
	fn zero_window_is_treated_as_one_for_sending_but_disables_backoff() {
		let mut input = ByteStream::new(64);
		input.writer().push(b"z");

		let mut sender = TcpSender::new(input, Wrap32::new(0), 1000);
		sender.receive(recv_msg(None, 0));

		let mut sent = Vec::new();
		sender.push(|msg| sent.push(msg.clone()));
		assert_eq!(sent.len(), 1);

		let mut retransmits = Vec::new();
		sender.tick(1000, |msg| retransmits.push(msg.clone()));
		assert_eq!(retransmits.len(), 1);
	}

	#[test]
	fn ack_of_unsent_data_is_ignored() {
		let mut input = ByteStream::new(64);
		input.writer().push(b"ab");

		let mut sender = TcpSender::new(input, Wrap32::new(0), 1000);
		sender.push(|_| {});

		let before = sender.sequence_numbers_in_flight();
		sender.receive(recv_msg(Some(1000), 4));
		assert_eq!(sender.sequence_numbers_in_flight(), before);
	}

	#[test]
	fn rst_received_sets_input_error_and_next_segment_carries_rst() {
		let input = ByteStream::new(64);
		let mut sender = TcpSender::new(input, Wrap32::new(0), 1000);

		sender.receive(TcpReceiverMessage { ackno: None, window_size: 1, rst: true });
		assert!(sender.make_empty_message().rst);
	}

	#[test]
	fn outstanding_bytes_matches_sum_of_sequence_lengths() {
		let mut input = ByteStream::new(64);
		input.writer().push(b"abcdefgh");

		let mut sender = TcpSender::new(input, Wrap32::new(0), 1000);
		sender.receive(recv_msg(None, 100));

		let mut sent = Vec::new();
		sender.push(|msg| sent.push(msg.clone()));

		let total: u64 = sent.iter().map(super::TcpSenderMessage::sequence_length).sum();
		assert_eq!(sender.sequence_numbers_in_flight(), total);
	}
}
