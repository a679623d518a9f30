use clap::Parser;
use log::error;
use stepflow::{logging, AppConfig, Cli};

fn main() {
    let cli = Cli::parse();
    let config = AppConfig::from_env().with_log_filter(cli.log.clone());
    if let Err(e) = logging::init_logging(&config.log_filter) {
        eprintln!("[stepflow] {e}");
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = stepflow::run(cli, &config, &mut out) {
        error!("{e}");
        eprintln!("[stepflow] {e}");
        std::process::exit(e.exit_code());
    }
}
