mod args;
mod commands;
mod output;

use clap::Parser;

#[tokio::main]
async fn main() {
    #[cfg(unix)]
    reset_sigpipe();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = args::Cli::parse();
    let code = commands::dispatch(cli.command).await;
    std::process::exit(code);
}

#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
