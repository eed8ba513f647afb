use std::collections::VecDeque;

/// A bounded FIFO of bytes, exclusively owned by whichever component constructs it.
///
/// The stream never blocks: pushing past capacity silently truncates, and nothing here
/// ever returns an error to the caller except through the separate [`ByteStream::has_error`]
/// flag, which is sticky once set.
pub struct ByteStream {
	capacity: usize,
	buffer: VecDeque<u8>,
	pushed: u64,
	popped: u64,
	closed: bool,
	error: bool,
}

impl ByteStream {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self { capacity, buffer: VecDeque::new(), pushed: 0, popped: 0, closed: false, error: false }
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Signal that the stream suffered an unrecoverable error.
	pub fn set_error(&mut self) {
		self.error = true;
	}

	#[must_use]
	pub fn has_error(&self) -> bool {
		self.error
	}

	#[must_use]
	pub fn writer(&mut self) -> Writer<'_> {
		Writer(self)
	}

	#[must_use]
	pub fn reader(&mut self) -> Reader<'_> {
		Reader(self)
	}
}

/// The producer-side capability view onto a [`ByteStream`].
pub struct Writer<'a>(&'a mut ByteStream);

impl Writer<'_> {
	/// Appends as much of `data` as `available_capacity` allows, silently truncating the tail.
	///
	/// Does nothing if the stream is closed or `data` is empty.
	pub fn push(&mut self, data: &[u8]) {
		if self.0.closed || data.is_empty() {
			return;
		}

		let n = data.len().min(self.available_capacity());

		self.0.buffer.extend(&data[..n]);
		self.0.pushed += n as u64;
	}

	/// Marks end-of-input. Idempotent.
	pub fn close(&mut self) {
		self.0.closed = true;
	}

	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.0.closed
	}

	#[must_use]
	pub fn available_capacity(&self) -> usize {
		self.0.capacity - self.0.buffer.len()
	}

	#[must_use]
	pub fn bytes_pushed(&self) -> u64 {
		self.0.pushed
	}
}

/// The consumer-side capability view onto a [`ByteStream`].
pub struct Reader<'a>(&'a mut ByteStream);

impl Reader<'_> {
	/// Returns a contiguous view of the currently buffered prefix.
	///
	/// Need not expose the whole buffer in one call (the underlying storage is a
	/// ring buffer), but always returns a non-empty slice when any bytes are buffered.
	#[must_use]
	pub fn peek(&self) -> &[u8] {
		self.0.buffer.as_slices().0
	}

	/// Discards `min(n, bytes_buffered())` bytes from the front of the buffer.
	pub fn pop(&mut self, n: usize) {
		let n = n.min(self.0.buffer.len());
		self.0.buffer.drain(..n);
		self.0.popped += n as u64;
	}

	#[must_use]
	pub fn is_finished(&self) -> bool {
		self.0.closed && self.0.buffer.is_empty()
	}

	#[must_use]
	pub fn bytes_buffered(&self) -> usize {
		self.0.buffer.len()
	}

	#[must_use]
	pub fn bytes_popped(&self) -> u64 {
		self.0.popped
	}
}

/// Peeks and pops up to `len` bytes from `reader`, appending them to `out`.
pub fn read(reader: &mut Reader<'_>, len: usize, out: &mut Vec<u8>) {
	let mut remaining = len.min(reader.bytes_buffered());

	while remaining > 0 {
		let chunk = reader.peek();
		if chunk.is_empty() {
			break;
		}

		let n = chunk.len().min(remaining);
		out.extend_from_slice(&chunk[..n]);
		reader.pop(n);
		remaining -= n;
	}
}

#[cfg(test)]
mod tests {
	use super::{read, ByteStream};

	#[test]
	fn capacity_truncates_and_tracks_counters() {
		let mut stream = ByteStream::new(4);

		stream.writer().push(b"hello");
		assert_eq!(stream.reader().peek(), b"hell");
		assert_eq!(stream.writer().bytes_pushed(), 4);

		stream.reader().pop(2);
		assert_eq!(stream.reader().peek(), b"ll");
		assert_eq!(stream.reader().bytes_popped(), 2);
		assert_eq!(stream.writer().available_capacity(), 2);

		stream.writer().push(b"o");
		assert_eq!(stream.reader().peek(), b"llo");
		assert_eq!(stream.writer().bytes_pushed(), 5);

		stream.writer().close();
		stream.reader().pop(3);
		assert!(stream.reader().is_finished());
	}

	#[test]
	fn push_after_close_is_a_noop() {
		let mut stream = ByteStream::new(4);
		stream.writer().close();
		stream.writer().push(b"x");
		assert_eq!(stream.writer().bytes_pushed(), 0);
	}

	#[test]
	fn empty_push_is_a_noop() {
		let mut stream = ByteStream::new(4);
		stream.writer().push(b"");
		assert_eq!(stream.writer().bytes_pushed(), 0);
	}

	#[test]
	fn error_flag_is_sticky() {
		let mut stream = ByteStream::new(4);
		stream.set_error();
		assert!(stream.has_error());
	}

	#[test]
	fn read_helper_pops_exactly_what_it_peeked() {
		let mut stream = ByteStream::new(8);
		stream.writer().push(b"abcdef");

		let mut out = Vec::new();
		read(&mut stream.reader(), 3, &mut out);
		assert_eq!(out, b"abc");
		assert_eq!(stream.reader().bytes_buffered(), 3);
	}
}
