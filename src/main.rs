//! baseliner binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match baseliner::cli::run() {
        Ok(code) => code,
        Err(err) => {
            baseliner::ui::output::error(format!("{:#}", err));
            ExitCode::from(2)
        }
    }
}
