use std::ffi::OsStr;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::global::State;

#[derive(Debug, Error)]
pub enum BuiltinError {
	#[error("cd: HOME not set")]
	HomeNotSet,
	#[error("{op}: {}", .errno.desc())]
	Sys { op: &'static str, errno: Errno },
	#[error("{0}")]
	Io(#[from] io::Error),
}

type BuiltinResult = Result<(), BuiltinError>;

/// A command run inside the shell process. `args[0]` is the command name.
pub type Builtin = fn(&mut State, &[&[u8]], &mut dyn Write) -> u8;

fn report(r: BuiltinResult) -> u8 {
	match r {
		Ok(()) => 0,
		Err(e) => {
			let _ = writeln!(io::stderr(), "{}", e);
			1
		},
	}
}

fn cd(state: &mut State, args: &[&[u8]]) -> BuiltinResult {
	let target = match args.get(1) {
		Some(&dir) => PathBuf::from(OsStr::from_bytes(dir)),
		None => PathBuf::from(state.home().ok_or(BuiltinError::HomeNotSet)?),
	};
	state.change_dir(&target).map_err(|errno| BuiltinError::Sys { op: "cd", errno: errno })
}

fn pwd(state: &mut State, out: &mut dyn Write) -> BuiltinResult {
	let cwd = state.current_dir().map_err(|errno| BuiltinError::Sys { op: "pwd", errno: errno })?;
	out.write_all(cwd.as_os_str().as_bytes())?;
	out.write_all(b"\n")?;
	out.flush()?;
	Ok(())
}

fn unescape(arg: &[u8], buf: &mut Vec<u8>) {
	let mut chars = arg.iter();
	while let Some(&c) = chars.next() {
		if c != b'\\' {
			buf.push(c);
			continue;
		}
		match chars.next() {
			Some(b'n') => buf.push(b'\n'),
			Some(b't') => buf.push(b'\t'),
			Some(b'r') => buf.push(b'\r'),
			Some(&other) => buf.push(other),
			None => buf.push(b'\\'),
		}
	}
}

fn echo(args: &[&[u8]], out: &mut dyn Write) -> BuiltinResult {
	let mut words = args.get(1 ..).unwrap_or(&[]);
	let escapes = words.first() == Some(&&b"-e"[..]);
	if escapes {
		words = &words[1 ..];
	}
	let mut buf = Vec::new();
	for (i, word) in words.iter().enumerate() {
		if i > 0 {
			buf.push(b' ');
		}
		if escapes {
			unescape(word, &mut buf);
		} else {
			buf.extend_from_slice(word);
		}
	}
	buf.push(b'\n');
	out.write_all(&buf)?;
	out.flush()?;
	Ok(())
}

pub fn builtin_cd(state: &mut State, args: &[&[u8]], _: &mut dyn Write) -> u8 {
	report(cd(state, args))
}

pub fn builtin_pwd(state: &mut State, _: &[&[u8]], out: &mut dyn Write) -> u8 {
	report(pwd(state, out))
}

pub fn builtin_echo(_: &mut State, args: &[&[u8]], out: &mut dyn Write) -> u8 {
	report(echo(args, out))
}

pub fn match_builtin(name: &[u8]) -> Option<Builtin> {
	match name {
		b"cd" => Some(builtin_cd),
		b"pwd" => Some(builtin_pwd),
		b"echo" => Some(builtin_echo),
		_ => None,
	}
}

pub fn is_builtin(name: &[u8]) -> bool {
	match_builtin(name).is_some()
}
