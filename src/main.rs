use clap::Parser;
use eigenmittel::api::{Cli, Command, print_evaluation, run_http_server};

#[tokio::main]
async fn main() {
    eigenmittel::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve(args) => run_http_server(&args).await,
        Command::Evaluate(args) => print_evaluation(&args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "eigenmittel failed");
        std::process::exit(1);
    }
}
