use std::os::unix::io::RawFd;

use thiserror::Error;

use crate::config::MAX_CMDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("Duplicate input redirection.")]
	DuplicateInput,
	#[error("Input file not specified.")]
	MissingInput,
	#[error("Duplicate output redirection.")]
	DuplicateOutput,
	#[error("Output file not specified after redirection.")]
	MissingOutput,
	#[error("Duplicate error redirection.")]
	DuplicateError,
	#[error("Error output file not specified.")]
	MissingError,
	#[error("Empty command between pipes.")]
	EmptyBetweenPipes,
	#[error("Command missing after pipe.")]
	MissingAfterPipe,
	#[error("Too many commands in pipeline (max {}).", MAX_CMDS)]
	TooManyCommands,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Error }

impl RedirectType {
	pub const ALL: [RedirectType; 3] = [RedirectType::Input, RedirectType::Output, RedirectType::Error];

	pub fn from_token(token: &[u8]) -> Option<RedirectType> {
		match token {
			b"<" => Some(RedirectType::Input),
			b">" => Some(RedirectType::Output),
			b"2>" => Some(RedirectType::Error),
			_ => None,
		}
	}

	/// The standard stream this redirection replaces.
	pub fn fd(self) -> RawFd {
		match self {
			RedirectType::Input => libc::STDIN_FILENO,
			RedirectType::Output => libc::STDOUT_FILENO,
			RedirectType::Error => libc::STDERR_FILENO,
		}
	}

	pub fn duplicate_error(self) -> ParseError {
		match self {
			RedirectType::Input => ParseError::DuplicateInput,
			RedirectType::Output => ParseError::DuplicateOutput,
			RedirectType::Error => ParseError::DuplicateError,
		}
	}

	pub fn missing_error(self) -> ParseError {
		match self {
			RedirectType::Input => ParseError::MissingInput,
			RedirectType::Output => ParseError::MissingOutput,
			RedirectType::Error => ParseError::MissingError,
		}
	}
}

/// One parsed pipeline segment. Slices borrow from the input line.
///
/// When `parse_error` is set nothing else in the descriptor is meaningful.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Command<'a> {
	pub name: Option<&'a [u8]>,
	pub arguments: Vec<&'a [u8]>,
	pub input_redirect: Option<&'a [u8]>,
	pub output_redirect: Option<&'a [u8]>,
	pub error_redirect: Option<&'a [u8]>,
	pub parse_error: Option<ParseError>,
}

impl<'a> Command<'a> {
	pub fn redirect(&self, typ: RedirectType) -> Option<&'a [u8]> {
		match typ {
			RedirectType::Input => self.input_redirect,
			RedirectType::Output => self.output_redirect,
			RedirectType::Error => self.error_redirect,
		}
	}

	pub fn redirect_mut(&mut self, typ: RedirectType) -> &mut Option<&'a [u8]> {
		match typ {
			RedirectType::Input => &mut self.input_redirect,
			RedirectType::Output => &mut self.output_redirect,
			RedirectType::Error => &mut self.error_redirect,
		}
	}

	/// Redirections in application order: input, output, error.
	pub fn redirects(&self) -> Vec<(RedirectType, &'a [u8])> {
		RedirectType::ALL.iter()
			.filter_map(|&typ| self.redirect(typ).map(|target| (typ, target)))
			.collect()
	}

	pub fn has_redirects(&self) -> bool {
		RedirectType::ALL.iter().any(|&typ| self.redirect(typ).is_some())
	}
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Pipeline<'a> {
	pub commands: Vec<Command<'a>>,
	pub parse_error: Option<ParseError>,
}

impl<'a> Pipeline<'a> {
	pub fn count(&self) -> usize {
		self.commands.len()
	}
}
