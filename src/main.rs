//! Network Speed Tester - command-line entry point

use clap::Parser;
use network_speed_tester::{
    app::App,
    cli::Cli,
    error::{ErrorReporter, Result},
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue at: https://github.com/MaurUppi/network-speed-tester/issues");
        process::exit(1);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(!cli.no_color, cli.verbose || cli.debug);

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            reporter.report_error(&e);
            process::exit(e.exit_code());
        }
    }
}

async fn run_application(cli: Cli) -> Result<i32> {
    let status = App::new(cli)?.run().await?;
    Ok(status.exit_code())
}
