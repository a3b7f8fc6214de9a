use log::debug;
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;
use thiserror::Error;

use crate::builtin;
use crate::search::SearchPath;
use crate::types::{Command, ParseError, Pipeline};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
	#[error("{0}")]
	Parse(ParseError),
	#[error("No command specified.")]
	NoCommand,
	#[error("{}: {}", String::from_utf8_lossy(.path), .errno.desc())]
	InputFile { path: Vec<u8>, errno: Errno },
	#[error("{}: command not found", String::from_utf8_lossy(.0))]
	NotFound(Vec<u8>),
	#[error("{}: command not found in pipe sequence", String::from_utf8_lossy(.0))]
	NotFoundInPipe(Vec<u8>),
}

impl ValidateError {
	/// Diagnostics about the user's input carry an `Error:` prefix; OS
	/// failures on a named file are shown as `path: reason`.
	pub fn is_file_error(&self) -> bool {
		match *self {
			ValidateError::InputFile { .. } => true,
			_ => false,
		}
	}
}

// Probe only: the file is opened again when the command runs.
fn check_input(path: &[u8]) -> Result<(), ValidateError> {
	let fd = fcntl::open(path, OFlag::O_RDONLY, Mode::empty())
		.map_err(|errno| ValidateError::InputFile { path: path.to_owned(), errno: errno })?;
	let _ = unistd::close(fd);
	Ok(())
}

/// Checks one descriptor: no parse error, a command name, and a readable
/// input file. The name is not resolved; process creation does that.
pub fn validate_command(command: &Command) -> Result<(), ValidateError> {
	if let Some(e) = command.parse_error {
		return Err(ValidateError::Parse(e));
	}
	if command.name.is_none() {
		return Err(ValidateError::NoCommand);
	}
	if let Some(path) = command.input_redirect {
		check_input(path)?;
	}
	Ok(())
}

/// Checks every stage and additionally requires each name to be a built-in
/// or an executable reachable through `search`.
pub fn validate_pipeline(pipeline: &Pipeline, search: &SearchPath) -> Result<(), ValidateError> {
	if let Some(e) = pipeline.parse_error {
		return Err(ValidateError::Parse(e));
	}
	if pipeline.commands.is_empty() {
		return Err(ValidateError::NoCommand);
	}
	let lone = pipeline.count() == 1;
	for command in &pipeline.commands {
		validate_command(command)?;
		let name = match command.name {
			Some(name) => name,
			None => { return Err(ValidateError::NoCommand); },
		};
		if builtin::is_builtin(name) {
			continue;
		}
		match search.lookup(name) {
			Some(path) => debug!("{} resolves to {}", String::from_utf8_lossy(name), path.display()),
			None if lone => { return Err(ValidateError::NotFound(name.to_owned())); },
			None => { return Err(ValidateError::NotFoundInPipe(name.to_owned())); },
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::{parse_command, parse_pipeline};
	use crate::test::{make_executable, make_file};

	#[test]
	fn parse_error_is_propagated() {
		let command = parse_command(b"cat <");
		assert_eq!(validate_command(&command), Err(ValidateError::Parse(ParseError::MissingInput)));
		assert_eq!(validate_command(&command).unwrap_err().to_string(), "Input file not specified.");
	}

	#[test]
	fn redirect_only_segment_has_no_command() {
		let command = parse_command(b"> out.txt");
		assert_eq!(validate_command(&command), Err(ValidateError::NoCommand));
		assert_eq!(ValidateError::NoCommand.to_string(), "No command specified.");
	}

	#[test]
	fn missing_input_file_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let line = format!("cat < {}/absent.txt", dir.path().display());
		let err = validate_command(&parse_command(line.as_bytes())).unwrap_err();
		assert!(err.is_file_error());
		assert_eq!(err.to_string(), format!("{}/absent.txt: No such file or directory", dir.path().display()));
	}

	#[test]
	fn existing_input_file_is_accepted_repeatedly() {
		let dir = tempfile::tempdir().unwrap();
		let input = make_file(dir.path(), "in.txt", "data");
		let line = format!("cat < {}", input.display());
		let command = parse_command(line.as_bytes());
		assert_eq!(validate_command(&command), Ok(()));
		assert_eq!(validate_command(&command), Ok(()));
	}

	#[test]
	fn lone_command_name_is_not_resolved() {
		assert_eq!(validate_command(&parse_command(b"no-such-program-pipesh")), Ok(()));
	}

	#[test]
	fn pipeline_names_must_resolve() {
		let dir = tempfile::tempdir().unwrap();
		make_executable(dir.path(), "producer");
		let search = SearchPath::new(Some(dir.path().as_os_str().to_owned()));

		assert_eq!(validate_pipeline(&parse_pipeline(b"producer | echo x | pwd"), &search), Ok(()));
		let err = validate_pipeline(&parse_pipeline(b"producer | consumer"), &search).unwrap_err();
		assert_eq!(err, ValidateError::NotFoundInPipe(b"consumer".to_vec()));
		assert_eq!(err.to_string(), "consumer: command not found in pipe sequence");
	}

	#[test]
	fn pipeline_accepts_paths_with_slash() {
		let dir = tempfile::tempdir().unwrap();
		let tool = make_executable(dir.path(), "tool");
		let line = format!("{} | {}", tool.display(), tool.display());
		assert_eq!(validate_pipeline(&parse_pipeline(line.as_bytes()), &SearchPath::new(None)), Ok(()));
	}

	#[test]
	fn single_stage_pipeline_reports_plain_not_found() {
		let mut pipeline = parse_pipeline(b"nothing-here");
		assert_eq!(pipeline.count(), 1);
		let err = validate_pipeline(&pipeline, &SearchPath::new(None)).unwrap_err();
		assert_eq!(err.to_string(), "nothing-here: command not found");

		pipeline.commands.clear();
		assert_eq!(validate_pipeline(&pipeline, &SearchPath::new(None)), Err(ValidateError::NoCommand));
	}

	#[test]
	fn pipeline_level_error_wins() {
		let search = SearchPath::new(None);
		let err = validate_pipeline(&parse_pipeline(b"a | | b"), &search).unwrap_err();
		assert_eq!(err, ValidateError::Parse(ParseError::EmptyBetweenPipes));
	}

	#[test]
	fn pipeline_checks_input_files() {
		let dir = tempfile::tempdir().unwrap();
		make_executable(dir.path(), "tool");
		let search = SearchPath::new(Some(dir.path().as_os_str().to_owned()));
		let line = format!("tool | tool < {}/gone", dir.path().display());
		let err = validate_pipeline(&parse_pipeline(line.as_bytes()), &search).unwrap_err();
		assert!(err.is_file_error());
	}
}
