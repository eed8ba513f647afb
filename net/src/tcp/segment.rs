use crate::wrap32::Wrap32;

/// The largest payload a single [`TcpSenderMessage`] may carry.
pub const MAX_PAYLOAD_SIZE: usize = 1000;

/// A segment travelling from a TCP sender to its peer's receiver.
#[derive(Clone, Debug)]
pub struct TcpSenderMessage {
	pub seqno: Wrap32,
	pub syn: bool,
	pub payload: Vec<u8>,
	pub fin: bool,
	pub rst: bool,
}

impl TcpSenderMessage {
	#[must_use]
	pub fn sequence_length(&self) -> u64 {
		self.syn as u64 + self.payload.len() as u64 + self.fin as u64
	}
}

/// A status update travelling from a TCP receiver back to the sender.
#[derive(Clone, Debug, Default)]
pub struct TcpReceiverMessage {
	pub ackno: Option<Wrap32>,
	pub window_size: u16,
	pub rst: bool,
}
