use {
    crate::{Config, panic_hook},
    std::{io::IsTerminal as _, sync::Once},
    time::macros::format_description,
    tracing::Level,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        Registry,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the global tracing subscriber and the tracing panic hook.
/// The filter in `config` has similar syntax to env_logger. It is documented
/// at https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    panic_hook::install();
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(config: &Config) {
    // The tracing subscriber below is global object so initializing it again in the
    // same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_tracing_subscriber(config);
        panic_hook::install();
    });
}

fn set_tracing_subscriber(config: &Config) {
    // Plain and JSON output produce different layer types, so the shared
    // configuration is applied through a macro and the result boxed.
    macro_rules! fmt_layer {
        ($layer:expr) => {{
            $layer
                .with_writer(
                    std::io::stdout
                        .with_min_level(config.stderr_threshold.unwrap_or(Level::ERROR))
                        .or_else(std::io::stderr),
                )
                .with_timer(UtcTime::new(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                )))
                .with_filter(EnvFilter::new(&config.env_filter))
                .boxed()
        }};
    }

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.use_json_format {
        fmt_layer!(tracing_subscriber::fmt::layer().json().with_ansi(false))
    } else {
        fmt_layer!(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
    };

    tracing_subscriber::registry().with(fmt_layer).init();
}
