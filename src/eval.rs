use std::ffi::{self, CString};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};

use log::{debug, trace};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd;
use thiserror::Error;

use crate::builtin::{self, Builtin};
use crate::global::State;
use crate::job::JobBuilder;
use crate::redirect;
use crate::types::{Command, Pipeline};

/// Status of a child that failed while wiring its descriptors.
const EXIT_SETUP_FAILED: i32 = 1;
/// Status of a child whose program could not be started.
const EXIT_NOT_STARTED: i32 = 127;

#[derive(Debug, Error)]
pub enum ExecError {
	#[error("{op}: {}", .errno.desc())]
	Sys { op: &'static str, errno: Errno },
	#[error("{}: {}", String::from_utf8_lossy(.path), .errno.desc())]
	Open { path: Vec<u8>, errno: Errno },
	#[error("argument contains a nul byte: {0}")]
	Nul(#[from] ffi::NulError),
}

impl ExecError {
	pub fn sys(op: &'static str) -> impl FnOnce(Errno) -> ExecError {
		move |errno| ExecError::Sys { op: op, errno: errno }
	}
}

/// A command ready to run in a child: its argv is built before forking.
struct Stage<'c, 'a> {
	command: &'c Command<'a>,
	argv: Vec<CString>,
	builtin: Option<Builtin>,
}

impl<'c, 'a> Stage<'c, 'a> {
	fn new(command: &'c Command<'a>, builtin: Option<Builtin>) -> Result<Stage<'c, 'a>, ExecError> {
		let argv: Result<Vec<CString>, ffi::NulError> = command.arguments.iter().map(|&s| CString::new(s)).collect();
		Ok(Stage { command: command, argv: argv?, builtin: builtin })
	}
}

fn exit_child(code: i32) -> ! {
	let _ = io::stdout().flush();
	unsafe { libc::_exit(code) }
}

fn exec_external(stage: &Stage) -> ! {
	let name = match stage.argv.first() {
		Some(name) => name,
		None => exit_child(EXIT_NOT_STARTED),
	};
	// Rust starts with SIGPIPE ignored, and that disposition survives exec.
	let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };
	let e = match unistd::execvp(name, &stage.argv) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	let shown = name.to_string_lossy();
	let mut stderr = io::stderr();
	if e == Errno::ENOENT {
		let _ = writeln!(stderr, "{}: command not found", shown);
	} else {
		let _ = writeln!(stderr, "{}: {}", shown, e.desc());
	}
	exit_child(EXIT_NOT_STARTED)
}

/// Child side: explicit redirections, then the built-in or the program image.
fn run_child(state: &mut State, stage: &Stage) -> ! {
	for (typ, path) in stage.command.redirects() {
		if let Err(e) = redirect::apply(typ, path) {
			let _ = writeln!(io::stderr(), "{}", e);
			exit_child(EXIT_SETUP_FAILED);
		}
	}
	if let Some(func) = stage.builtin {
		let status = func(state, &stage.command.arguments, &mut io::stdout());
		exit_child(status as i32);
	}
	exec_external(stage)
}

fn open_pipes(count: usize) -> Result<Vec<(OwnedFd, OwnedFd)>, ExecError> {
	(0 .. count).map(|_| unistd::pipe().map_err(ExecError::sys("pipe"))).collect()
}

/// Connects stage `i` of `n` to its neighbours, then closes every pipe end.
fn connect_pipes(i: usize, n: usize, pipes: &[(OwnedFd, OwnedFd)]) -> Result<(), ExecError> {
	if i > 0 {
		unistd::dup2(pipes[i - 1].0.as_raw_fd(), libc::STDIN_FILENO).map_err(ExecError::sys("dup2 pipe input"))?;
	}
	if i + 1 < n {
		unistd::dup2(pipes[i].1.as_raw_fd(), libc::STDOUT_FILENO).map_err(ExecError::sys("dup2 pipe output"))?;
	}
	for (pipe_read, pipe_write) in pipes {
		let _ = unistd::close(pipe_read.as_raw_fd());
		let _ = unistd::close(pipe_write.as_raw_fd());
	}
	Ok(())
}

fn spawn_stages(state: &mut State, stages: &[Stage], job_builder: &mut JobBuilder) -> Result<(), ExecError> {
	let pipes = open_pipes(stages.len().saturating_sub(1))?;
	for (i, stage) in stages.iter().enumerate() {
		match job_builder.push_fork().map_err(ExecError::sys("fork"))? {
			unistd::ForkResult::Parent { .. } => {},
			unistd::ForkResult::Child => {
				if let Err(e) = connect_pipes(i, stages.len(), &pipes) {
					let _ = writeln!(io::stderr(), "{}", e);
					exit_child(EXIT_SETUP_FAILED);
				}
				run_child(state, stage);
			},
		}
	}
	trace!("closing {} pipes in the shell", pipes.len());
	drop(pipes);
	Ok(())
}

/// Runs a single validated command. Built-ins run in this process so that
/// their effects persist; anything else runs in one child.
pub fn execute_command(state: &mut State, command: &Command) -> Result<u8, ExecError> {
	let name = match command.name {
		Some(name) => name,
		None => { return Ok(0); },
	};

	if let Some(func) = builtin::match_builtin(name) {
		debug!("running built-in {} in the shell", String::from_utf8_lossy(name));
		return state.with_redirects(command, |state| {
			func(state, &command.arguments, &mut io::stdout())
		});
	}

	let stage = Stage::new(command, None)?;
	let mut job_builder = JobBuilder::new(1);
	let r = spawn_stages(state, &[stage], &mut job_builder);
	let status = job_builder.build().wait();
	r.map(|()| status)
}

/// Runs every stage of a validated pipeline concurrently and waits for all of them.
/// Built-ins become ordinary stages running in their own child.
pub fn execute_pipeline(state: &mut State, pipeline: &Pipeline) -> Result<u8, ExecError> {
	let stages: Result<Vec<Stage>, ExecError> = pipeline.commands.iter()
		.map(|c| Stage::new(c, c.name.and_then(builtin::match_builtin)))
		.collect();
	let stages = stages?;

	let mut job_builder = JobBuilder::new(stages.len());
	let r = spawn_stages(state, &stages, &mut job_builder);
	// Children spawned before a failure are reaped too.
	let status = job_builder.build().wait();
	debug!("pipeline of {} finished with {}", pipeline.count(), status);
	r.map(|()| status)
}
