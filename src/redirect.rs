use std::io::{self, Write};
use std::os::unix::io::RawFd;

use log::{trace, warn};
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;

use crate::eval::ExecError;
use crate::types::RedirectType;

fn open_target(typ: RedirectType, path: &[u8]) -> Result<RawFd, ExecError> {
	let (flags, mode) = match typ {
		RedirectType::Input => (OFlag::O_RDONLY, Mode::empty()),
		RedirectType::Output | RedirectType::Error => (
			OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
			Mode::from_bits_truncate(0o644),
		),
	};
	fcntl::open(path, flags, mode).map_err(|errno| ExecError::Open { path: path.to_owned(), errno: errno })
}

/// Points the standard stream for `typ` at `path`.
pub fn apply(typ: RedirectType, path: &[u8]) -> Result<(), ExecError> {
	let fd = open_target(typ, path)?;
	let r = unistd::dup2(fd, typ.fd());
	let _ = unistd::close(fd);
	r.map_err(ExecError::sys(match typ {
		RedirectType::Input => "dup2 input",
		RedirectType::Output => "dup2 output",
		RedirectType::Error => "dup2 error",
	}))?;
	Ok(())
}

/// Copies of standard streams taken before redirecting them in the shell's own process.
/// Every saved descriptor is put back and closed when this is dropped.
#[derive(Debug, Default)]
pub struct SavedStreams {
	saved: Vec<(RawFd, RawFd)>,
}

impl SavedStreams {
	pub fn new() -> SavedStreams {
		SavedStreams::default()
	}

	pub fn redirect(&mut self, typ: RedirectType, path: &[u8]) -> Result<(), ExecError> {
		let target = typ.fd();
		let copy = unistd::dup(target).map_err(ExecError::sys("dup"))?;
		trace!("saved fd {} as {}", target, copy);
		self.saved.push((target, copy));
		apply(typ, path)
	}
}

impl Drop for SavedStreams {
	fn drop(&mut self) {
		let _ = io::stdout().flush();
		let _ = io::stderr().flush();
		for (target, copy) in self.saved.drain(..).rev() {
			if let Err(e) = unistd::dup2(copy, target) {
				warn!("restoring fd {} failed: {}", target, e);
			}
			let _ = unistd::close(copy);
			trace!("restored fd {}", target);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::os::fd::BorrowedFd;
	use std::os::unix::fs::MetadataExt;
	use crate::test::lock_process_state;

	fn inode_of(fd: RawFd) -> u64 {
		let fd = unsafe { BorrowedFd::borrow_raw(fd) };
		let file = fs::File::from(fd.try_clone_to_owned().unwrap());
		file.metadata().unwrap().ino()
	}

	#[test]
	fn saved_streams_restore_stdout() {
		let _guard = lock_process_state();
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("out.txt");
		let before = inode_of(libc::STDOUT_FILENO);
		{
			let mut saved = SavedStreams::new();
			saved.redirect(RedirectType::Output, out.as_os_str().as_encoded_bytes()).unwrap();
			assert_ne!(inode_of(libc::STDOUT_FILENO), before);
			let mut stdout = io::stdout();
			stdout.write_all(b"captured\n").unwrap();
			stdout.flush().unwrap();
		}
		assert_eq!(inode_of(libc::STDOUT_FILENO), before);
		assert!(fs::read_to_string(&out).unwrap().contains("captured\n"));
	}

	#[test]
	fn output_target_is_truncated() {
		let _guard = lock_process_state();
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("err.txt");
		fs::write(&out, "old contents that are long").unwrap();
		{
			let mut saved = SavedStreams::new();
			saved.redirect(RedirectType::Error, out.as_os_str().as_encoded_bytes()).unwrap();
			io::stderr().write_all(b"new").unwrap();
		}
		assert_eq!(fs::read_to_string(&out).unwrap(), "new");
	}

	#[test]
	fn failed_open_still_restores() {
		let _guard = lock_process_state();
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("no/such/dir/out.txt");
		let before = inode_of(libc::STDOUT_FILENO);
		{
			let mut saved = SavedStreams::new();
			let err = saved.redirect(RedirectType::Output, out.as_os_str().as_encoded_bytes()).unwrap_err();
			assert!(err.to_string().ends_with("No such file or directory"), "{}", err);
		}
		assert_eq!(inode_of(libc::STDOUT_FILENO), before);
	}

	#[test]
	fn apply_reports_input_path() {
		let _guard = lock_process_state();
		let err = apply(RedirectType::Input, b"/no/such/input").unwrap_err();
		assert_eq!(err.to_string(), "/no/such/input: No such file or directory");
	}
}
