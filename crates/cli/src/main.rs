//! javac-cache binary
//!
//! Usage: `javac-cache [OPTIONS] <COMPILER> [ARGS]...`

use javac_cache::cli::{self, exit_code_for, render_error};
use javac_cache::tracing::{Level, TracingConfig, init_tracing};

fn main() {
    // NOTE: eprintln! in the panic hook is intentional; tracing may be unusable mid-panic.
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: if cli.verbose { Level::INFO } else { Level::WARN },
        ..Default::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{e:?}");
        }
    }

    let exit_code = match javac_cache::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}
