mod builtin;
mod config;
mod eval;
mod global;
mod input;
mod job;
mod parser;
mod redirect;
mod search;
mod types;
mod validate;

use std::io;
use io::Write;

use log::{debug, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use config::{Options, MAX_INPUT};
use global::State;
use input::{Line, LineReader};
use validate::ValidateError;

fn init_logging(level: LevelFilter) {
	if level == LevelFilter::Off {
		return;
	}
	let _ = TermLogger::init(level, simplelog::Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn report_invalid(e: &ValidateError) {
	if e.is_file_error() {
		eprintln!("{}", e);
	} else {
		eprintln!("Error: {}", e);
	}
}

fn eval_line(state: &mut State, line: &[u8]) {
	let r = if line.contains(&b'|') {
		let pipeline = parser::parse_pipeline(line);
		if let Err(e) = validate::validate_pipeline(&pipeline, &state.search_path()) {
			report_invalid(&e);
			return;
		}
		eval::execute_pipeline(state, &pipeline)
	} else {
		let command = parser::parse_command(line);
		if let Err(e) = validate::validate_command(&command) {
			report_invalid(&e);
			return;
		}
		eval::execute_command(state, &command)
	};
	match r {
		Ok(status) => debug!("exit status {}", status),
		Err(e) => eprintln!("{}", e),
	}
}

fn main() {
	let options: Options = argh::from_env();
	init_logging(options.level());

	let mut state = State::new();
	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut reader = LineReader::new(stdin.lock());
	loop {
		let _ = stdout.write_all(options.prompt.as_bytes());
		let _ = stdout.flush();
		let line = match reader.read_line() {
			Ok(Line::Text(line)) => line,
			Ok(Line::TooLong) => {
				eprintln!("Error: Input too long (maximum {} characters).", MAX_INPUT - 2);
				continue;
			},
			Ok(Line::Eof) => {
				let _ = writeln!(stdout);
				break;
			},
			Err(e) => {
				eprintln!("Error: reading input failed: {}", e);
				let _ = writeln!(stdout);
				break;
			},
		};
		let line = parser::trim(&line);
		if line == b"exit" {
			break;
		}
		if line.is_empty() {
			continue;
		}
		eval_line(&mut state, line);
	}
	let _ = stdout.flush();
}
