use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::debug;
use nix::unistd;

use crate::eval::ExecError;
use crate::redirect::SavedStreams;
use crate::search::SearchPath;
use crate::types::Command;

const HOME_KEY: &'static str = "HOME";

/// Handle on the state the shell process shares with everything it runs:
/// its working directory and its standard streams. Only `change_dir` and
/// `with_redirects` modify them.
pub struct State {
	_private: (),
}

impl State {
	pub fn new() -> State {
		State { _private: () }
	}

	pub fn home(&self) -> Option<OsString> {
		env::var_os(HOME_KEY)
	}

	pub fn search_path(&self) -> SearchPath {
		SearchPath::from_env()
	}

	pub fn current_dir(&self) -> nix::Result<PathBuf> {
		unistd::getcwd()
	}

	pub fn change_dir(&mut self, path: &Path) -> nix::Result<()> {
		unistd::chdir(path)?;
		debug!("working directory is now {}", path.display());
		Ok(())
	}

	/// Runs `f` with this process's standard streams pointed at the command's
	/// redirect targets. The streams are restored whether or not `f` runs;
	/// `f` is skipped when any redirection fails.
	pub fn with_redirects<F>(&mut self, command: &Command, f: F) -> Result<u8, ExecError>
			where F: FnOnce(&mut State) -> u8 {
		if !command.has_redirects() {
			return Ok(f(self));
		}
		let mut saved = SavedStreams::new();
		for (typ, path) in command.redirects() {
			saved.redirect(typ, path)?;
		}
		Ok(f(self))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::io::{self, Write};
	use crate::parser::parse_command;
	use crate::test::lock_process_state;

	#[test]
	fn change_dir_is_visible_to_current_dir() {
		let _guard = lock_process_state();
		let orig = env::current_dir().unwrap();
		let dir = tempfile::tempdir().unwrap();
		let mut state = State::new();
		state.change_dir(dir.path()).unwrap();
		assert_eq!(state.current_dir().unwrap(), dir.path().canonicalize().unwrap());
		state.change_dir(&orig).unwrap();
	}

	#[test]
	fn change_dir_reports_missing_target() {
		let _guard = lock_process_state();
		let mut state = State::new();
		assert_eq!(state.change_dir(Path::new("/definitely/not/here")), Err(nix::errno::Errno::ENOENT));
	}

	#[test]
	fn with_redirects_captures_stdout_and_runs_once() {
		let _guard = lock_process_state();
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("out.txt");
		let line = format!("pwd > {}", out.display());
		let command = parse_command(line.as_bytes());
		let mut state = State::new();
		let mut calls = 0;
		let status = state.with_redirects(&command, |_| {
			calls += 1;
			let mut stdout = io::stdout();
			let _ = stdout.write_all(b"redirected\n");
			let _ = stdout.flush();
			3
		}).unwrap();
		assert_eq!(status, 3);
		assert_eq!(calls, 1);
		assert!(fs::read_to_string(&out).unwrap().contains("redirected\n"));
	}

	#[test]
	fn with_redirects_skips_body_when_open_fails() {
		let _guard = lock_process_state();
		let dir = tempfile::tempdir().unwrap();
		let line = format!("pwd 2> {}/missing/err.txt", dir.path().display());
		let command = parse_command(line.as_bytes());
		let mut state = State::new();
		let mut called = false;
		let r = state.with_redirects(&command, |_| { called = true; 0 });
		assert!(r.is_err());
		assert!(!called);
	}
}
