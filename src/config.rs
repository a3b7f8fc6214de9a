use std::env;

use argh::FromArgs;
use log::LevelFilter;

/// Size of the line buffer, newline slot included.
pub const MAX_INPUT: usize = 1024;
/// Argument slots per command, one of which is reserved for the terminator.
pub const MAX_ARGS: usize = 64;
/// Commands allowed in one pipeline.
pub const MAX_CMDS: usize = 16;

pub const DEFAULT_PROMPT: &'static str = "$ ";
pub const LOG_ENV: &'static str = "PIPESH_LOG";

#[derive(FromArgs, Debug)]
/// A small interactive shell with pipes and I/O redirection.
pub struct Options {
	/// text printed before each input line
	#[argh(option, default = "String::from(DEFAULT_PROMPT)")]
	pub prompt: String,

	/// log verbosity: off, error, warn, info, debug or trace (overrides PIPESH_LOG)
	#[argh(option)]
	pub log_level: Option<LevelFilter>,
}

impl Options {
	pub fn level(&self) -> LevelFilter {
		self.log_level
			.or_else(|| env::var(LOG_ENV).ok().and_then(|v| v.parse().ok()))
			.unwrap_or(LevelFilter::Off)
	}
}
