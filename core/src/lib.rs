use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

pub mod backend;
pub mod config;
pub mod driver;
pub mod generator;
pub mod memory;
pub mod model;
pub mod profiler;

pub use backend::OrmBackend;
pub use config::{DriverConfig, WarmUpConfig, WorkloadShape};
pub use driver::{BenchmarkDriver, BenchmarkKind};
pub use generator::RandomObjectsGenerator;
pub use memory::InMemoryBackend;
pub use model::{Book, ComplexData, Library, Person};
pub use profiler::{SimpleProfiler, TimeUnit};

const LOGGING_PATTERN: &str = "{d} {l} {f}:{L} - {m}\n";

/// Install the global logger.
///
/// Everything at `log_level` and above goes to stderr. When `file_path` is
/// given, the same records are also appended to that file.
pub fn initialize_logger(log_level: LevelFilter, file_path: Option<&str>) -> anyhow::Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(log_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = file_path {
        let logfile = FileAppender::builder()
            // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
            .encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
            .build(path)?;

        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = config_builder.build(root.build(log_level))?;
    let _handle = log4rs::init_config(config)?;

    Ok(())
}
