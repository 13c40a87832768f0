use std::env;
use std::io;
use std::process::ExitCode;

use xboard_adapter::xboard::logger;
use xboard_adapter::{AskUserEngine, Config, Output, Session};

fn main() -> ExitCode {
    let config = Config::from_args(env::args().skip(1));

    let output = Output::stdout();
    output.set_debug(config.debug);
    if let Err(e) = logger::init(output.clone()) {
        eprintln!("failed to install logger: {e}");
    }
    config.report_ignored();

    let stdin = io::stdin();
    let mut session = Session::new(AskUserEngine::new(), stdin.lock(), output);
    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
