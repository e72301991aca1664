fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = planmark_cli::run(std::env::args_os()) {
        eprintln!("{:#}", error.source);
        std::process::exit(error.code);
    }
}
