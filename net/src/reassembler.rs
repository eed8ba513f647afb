use std::collections::BTreeMap;

use crate::bytestream::ByteStream;

/// Reassembles a byte stream from out-of-order, possibly overlapping substrings.
///
/// Owns the output [`ByteStream`]; pending segments are kept in a map keyed by their
/// first absolute index, and are always pairwise non-overlapping and non-adjacent-mergeable.
pub struct Reassembler {
	output: ByteStream,
	capacity: usize,
	pending: BTreeMap<u64, Vec<u8>>,
	unassembled_bytes: usize,
	eof_index: Option<u64>,
}

impl Reassembler {
	#[must_use]
	pub fn new(output: ByteStream) -> Self {
		let capacity = output.capacity();
		Self { output, capacity, pending: BTreeMap::new(), unassembled_bytes: 0, eof_index: None }
	}

	#[must_use]
	pub fn output(&mut self) -> &mut ByteStream {
		&mut self.output
	}

	#[must_use]
	pub fn bytes_pending(&self) -> usize {
		self.unassembled_bytes
	}

	fn first_unassembled(&mut self) -> u64 {
		self.output.writer().bytes_pushed()
	}

	fn first_unacceptable(&mut self) -> u64 {
		self.output.reader().bytes_popped() + self.capacity as u64
	}

	/// Offers a substring beginning at absolute index `first_index`.
	///
	/// Writes every byte that becomes known at the current unassembled index, buffers bytes
	/// that are known but not yet contiguous, discards bytes beyond the acceptance window, and
	/// closes the output once the byte before `eof_index` has been written.
	pub fn insert(&mut self, first_index: u64, data: &[u8], is_last: bool) {
		if !data.is_empty() {
			if let Some((clipped_index, clipped)) = self.clip(first_index, data) {
				self.merge_and_insert(clipped_index, clipped);
			}
		}

		self.drain_contiguous_prefix();

		if is_last {
			self.eof_index.get_or_insert(first_index + data.len() as u64);
		}

		if self.eof_index == Some(self.first_unassembled()) {
			self.output.writer().close();
		}
	}

	/// Clips `data` to the acceptance window `[first_unassembled, first_unacceptable)`.
	fn clip(&mut self, first_index: u64, data: &[u8]) -> Option<(u64, Vec<u8>)> {
		let first_unassembled = self.first_unassembled();
		let first_unacceptable = self.first_unacceptable();

		let end = first_index + data.len() as u64;

		if end <= first_unassembled || first_index >= first_unacceptable {
			return None;
		}

		let head_trim = first_unassembled.saturating_sub(first_index) as usize;
		let visible_end = (first_unacceptable.min(end) - first_index) as usize;

		if head_trim >= visible_end {
			return None;
		}

		let start_index = first_index + head_trim as u64;
		Some((start_index, data[head_trim..visible_end].to_vec()))
	}

	/// Merges `data` (already clipped to the window) against overlapping/adjacent pending
	/// segments, so the pending set stays pairwise disjoint and non-adjacent-mergeable.
	fn merge_and_insert(&mut self, mut index: u64, mut data: Vec<u8>) {
		let mut end = index + data.len() as u64;

		let overlapping: Vec<u64> = self
			.pending
			.range(..end)
			.filter(|(&seg_index, seg_data)| seg_index + seg_data.len() as u64 > index)
			.map(|(&seg_index, _)| seg_index)
			.collect();

		for seg_index in overlapping {
			let seg_data = self.pending.remove(&seg_index).unwrap();
			self.unassembled_bytes -= seg_data.len();
			let seg_end = seg_index + seg_data.len() as u64;

			if seg_index < index {
				// existing segment starts earlier: keep its head, then append ours past its tail.
				let mut merged = seg_data.clone();
				if seg_end < end {
					merged.extend_from_slice(&data[(seg_end - index) as usize..]);
				}
				data = merged;
				index = seg_index;
			} else if seg_end > end {
				// existing segment extends further right: our tail is already covered by it.
				data.truncate((seg_index - index) as usize);
				data.extend_from_slice(&seg_data);
			} else {
				// existing segment is fully contained within ours: nothing to add from it.
			}

			end = index + data.len() as u64;
		}

		self.unassembled_bytes += data.len();
		self.pending.insert(index, data);
	}

	fn drain_contiguous_prefix(&mut self) {
		loop {
			let first_unassembled = self.first_unassembled();

			let Some(&first) = self.pending.keys().next() else { break };
			if first != first_unassembled {
				break;
			}

			let data = self.pending.remove(&first).unwrap();
			self.unassembled_bytes -= data.len();
			self.output.writer().push(&data);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::Reassembler;
	use crate::bytestream::ByteStream;

	fn reassembler(capacity: usize) -> Reassembler {
		Reassembler::new(ByteStream::new(capacity))
	}

	#[test]
	fn overlapping_inserts_reassemble_in_order() {
		let mut r = reassembler(8);

		r.insert(0, b"ab", false);
		assert_eq!(r.bytes_pending(), 0);

		r.insert(4, b"ef", false);
		assert_eq!(r.bytes_pending(), 2);

		r.insert(2, b"cdef", false);
		assert_eq!(r.bytes_pending(), 4);

		r.insert(6, b"gh", true);
		assert_eq!(r.bytes_pending(), 0);

		let mut out = r.output().reader();
		assert_eq!(out.peek(), b"abcdefgh");
		assert!(out.is_finished());
	}

	#[test]
	fn out_of_window_bytes_are_discarded() {
		let mut r = reassembler(4);
		r.insert(10, b"xyz", false);
		assert_eq!(r.bytes_pending(), 0);
	}

	#[test]
	fn tail_beyond_capacity_is_truncated() {
		let mut r = reassembler(4);
		r.insert(0, b"abcdef", false);
		assert_eq!(r.bytes_pending(), 0);
		assert_eq!(r.output().reader().peek(), b"abcd");
	}

	#[test]
	fn duplicate_insert_is_idempotent() {
		let mut r = reassembler(8);
		r.insert(0, b"ab", false);
		r.insert(0, b"ab", false);
		assert_eq!(r.output().reader().peek(), b"ab");
		assert_eq!(r.bytes_pending(), 0);
	}

	#[test]
	fn segment_fully_inside_an_existing_segment_contributes_nothing() {
		let mut r = reassembler(8);
		r.insert(2, b"wxyz", false);
		assert_eq!(r.bytes_pending(), 4);

		r.insert(3, b"xy", false);
		assert_eq!(r.bytes_pending(), 4);
	}

	#[test]
	fn empty_last_substring_at_unassembled_index_closes_immediately() {
		let mut r = reassembler(4);
		r.insert(0, b"", true);
		assert!(r.output().reader().is_finished());
	}

	#[test]
	fn eof_may_arrive_before_the_bytes_preceding_it() {
		let mut r = reassembler(8);
		r.insert(2, b"cd", true);
		assert!(!r.output().reader().is_finished());

		r.insert(0, b"ab", false);
		assert!(r.output().reader().is_finished());
		assert_eq!(r.output().reader().peek(), b"abcd");
	}
}
