use std::env;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::unistd::{self, AccessFlags};

const PATH_KEY: &'static str = "PATH";

/// Ordered directory list taken from a `PATH`-style value. The first match wins.
pub struct SearchPath {
	dirs: Vec<PathBuf>,
}

impl SearchPath {
	pub fn new(value: Option<OsString>) -> SearchPath {
		let dirs = match value {
			Some(v) => env::split_paths(&v).collect(),
			None => vec![],
		};
		SearchPath { dirs: dirs }
	}

	pub fn from_env() -> SearchPath {
		SearchPath::new(env::var_os(PATH_KEY))
	}

	/// Names containing `/` are checked directly; bare names are joined onto each directory.
	pub fn lookup(&self, name: &[u8]) -> Option<PathBuf> {
		let name = OsStr::from_bytes(name);
		if name.as_bytes().contains(&b'/') {
			let path = PathBuf::from(name);
			return if is_executable(&path) { Some(path) } else { None };
		}
		self.dirs.iter()
			.map(|dir| dir.join(name))
			.find(|candidate| is_executable(candidate))
	}
}

fn is_executable(path: &Path) -> bool {
	path.is_file() && unistd::access(path, AccessFlags::X_OK).is_ok()
}
