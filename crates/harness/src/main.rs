use clap::Parser;

#[tokio::main]
async fn main() {
    let args = harness::arguments::Arguments::parse();
    let obs_config = observe::Config::new(
        &args.logging.log_filter,
        args.logging.log_stderr_threshold,
        args.logging.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    tracing::info!("running harness with validated arguments:\n{}", args);
    if let Err(err) = harness::run(args).await {
        tracing::error!(?err, "harness run failed");
        std::process::exit(1);
    }
}
