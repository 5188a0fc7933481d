use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    // Log to stderr to keep stdout clean for --json output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let code = cli::run()?;
    std::process::exit(code);
}
