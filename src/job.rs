use std::io::{self, Write};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::{self, Pid};

pub trait WaitStatusExt {
	/// Exit code in shell convention; killed processes report 128 + signal.
	fn code(self) -> Option<u8>;
}

impl WaitStatusExt for WaitStatus {
	fn code(self) -> Option<u8> {
		match self {
			WaitStatus::Exited(_, code) => Some(code as u8),
			WaitStatus::Signaled(_, sig, _) => Some(128u8.wrapping_add(sig as u8)),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: WaitStatus,
}

/// The children spawned for one input line, in pipeline order.
#[derive(Debug)]
pub struct Job {
	pub processes: Vec<Process>,
}

impl Job {
	/// Blocks until every process has terminated and returns the last one's code.
	pub fn wait(&mut self) -> u8 {
		for process in self.processes.iter_mut() {
			if process.status != WaitStatus::StillAlive {
				continue;
			}
			loop {
				match wait::waitpid(process.pid, None) {
					Ok(status @ WaitStatus::Exited(..)) | Ok(status @ WaitStatus::Signaled(..)) => {
						debug!("process {} finished: {:?}", process.pid, status);
						process.status = status;
						break;
					},
					Ok(_) | Err(Errno::EINTR) => continue,
					Err(e) => {
						warn!("waitpid {} failed: {}", process.pid, e);
						process.status = WaitStatus::Exited(process.pid, 1);
						break;
					},
				}
			}
		}
		self.processes.last().and_then(|pr| pr.status.code()).unwrap_or(0)
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(size_hint: usize) -> JobBuilder {
		JobBuilder {
			imp: Job { processes: Vec::with_capacity(size_hint) }
		}
	}

	pub fn push_fork(&mut self) -> nix::Result<unistd::ForkResult> {
		// Anything left in the buffer would be written twice.
		let _ = io::stdout().flush();

		// Safety: the shell runs on one thread, and a child only rewires its
		// descriptors before it execs or _exits.
		let r = unsafe { unistd::fork() }?;
		if let unistd::ForkResult::Parent { child: pid } = r {
			debug!("forked process {}", pid);
			self.imp.processes.push(Process { pid: pid, status: WaitStatus::StillAlive });
		}
		Ok(r)
	}

	pub fn build(self) -> Job {
		self.imp
	}
}
