use log::{debug, warn};

use crate::config::{MAX_ARGS, MAX_CMDS};
use crate::types::*;

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn new(line: &'a [u8]) -> Parser<'a> {
		Parser { line: line, i: 0 }
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn skip_spaces(&mut self) {
		self.proceed_while(|c| c == b' ');
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(|c| c != b' ');
		&self.line[orig .. self.i]
	}

	fn next_token(&mut self) -> Option<&'a [u8]> {
		self.skip_spaces();
		let word = self.read_word();
		if word.is_empty() { None } else { Some(word) }
	}

	fn parse_redirect(&mut self, command: &mut Command<'a>, typ: RedirectType) -> ParseResult<()> {
		if command.redirect(typ).is_some() {
			return Err(typ.duplicate_error());
		}
		let target = match self.next_token() {
			Some(t) if RedirectType::from_token(t).is_none() => t,
			_ => { return Err(typ.missing_error()); },
		};
		*command.redirect_mut(typ) = Some(target);
		Ok(())
	}

	fn parse_command(&mut self) -> Command<'a> {
		let mut command = Command::default();

		while let Some(token) = self.next_token() {
			if command.arguments.len() >= MAX_ARGS - 1 {
				warn!("argument list capped at {} entries", MAX_ARGS - 1);
				eprintln!("Warning: Maximum number of arguments ({}) exceeded. Extra arguments ignored.", MAX_ARGS - 1);
				break;
			}
			match RedirectType::from_token(token) {
				Some(typ) => if let Err(e) = self.parse_redirect(&mut command, typ) {
					command.parse_error = Some(e);
					return command;
				},
				None => {
					if command.name.is_none() {
						command.name = Some(token);
					}
					command.arguments.push(token);
				},
			}
		}
		command
	}
}

fn is_blank(c: u8) -> bool {
	c == b' ' || c == b'\t'
}

/// Strips spaces and tabs from both ends.
pub fn trim(s: &[u8]) -> &[u8] {
	let start = s.iter().position(|&c| !is_blank(c)).unwrap_or(s.len());
	let end = s.iter().rposition(|&c| !is_blank(c)).map_or(start, |i| i + 1);
	&s[start .. end]
}

pub fn parse_command<'a>(line: &'a [u8]) -> Command<'a> {
	let command = Parser::new(line).parse_command();
	debug!("parsed command: {:?}", command);
	command
}

pub fn parse_pipeline<'a>(line: &'a [u8]) -> Pipeline<'a> {
	let mut pipeline = Pipeline::default();
	let mut segments = line.split(|&c| c == b'|').peekable();

	while let Some(segment) = segments.next() {
		let segment = trim(segment);
		if segment.is_empty() {
			pipeline.parse_error = Some(if segments.peek().is_none() {
				ParseError::MissingAfterPipe
			} else {
				ParseError::EmptyBetweenPipes
			});
			return pipeline;
		}
		if pipeline.commands.len() >= MAX_CMDS {
			pipeline.parse_error = Some(ParseError::TooManyCommands);
			return pipeline;
		}
		let command = parse_command(segment);
		if let Some(e) = command.parse_error {
			pipeline.parse_error = Some(e);
			return pipeline;
		}
		pipeline.commands.push(command);
	}
	pipeline
}
