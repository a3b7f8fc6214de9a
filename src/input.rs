use std::io::{self, BufRead, Read};

use crate::config::MAX_INPUT;

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
	/// One line with its newline removed.
	Text(Vec<u8>),
	/// The line did not fit; it has been read to its end and dropped.
	TooLong,
	Eof,
}

pub struct LineReader<R> {
	inner: R,
	capacity: usize,
}

impl<R: BufRead> LineReader<R> {
	pub fn new(inner: R) -> LineReader<R> {
		LineReader { inner: inner, capacity: MAX_INPUT }
	}

	/// Reads at most `MAX_INPUT - 1` bytes, leaving room for the terminator.
	pub fn read_line(&mut self) -> io::Result<Line> {
		let limit = self.capacity - 1;
		let mut line = Vec::with_capacity(limit);
		let n = (&mut self.inner).take(limit as u64).read_until(b'\n', &mut line)?;
		if n == 0 {
			return Ok(Line::Eof);
		}
		if line.last() == Some(&b'\n') {
			line.pop();
			return Ok(Line::Text(line));
		}
		if n == limit {
			self.discard_rest()?;
			return Ok(Line::TooLong);
		}
		Ok(Line::Text(line))
	}

	fn discard_rest(&mut self) -> io::Result<()> {
		loop {
			let (done, used) = {
				let buf = self.inner.fill_buf()?;
				match buf.iter().position(|&c| c == b'\n') {
					Some(i) => (true, i + 1),
					None => (buf.is_empty(), buf.len()),
				}
			};
			self.inner.consume(used);
			if done {
				return Ok(());
			}
		}
	}
}
