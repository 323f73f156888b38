use env_logger::Target;
use log::LevelFilter;
use std::fs;
use std::path::Path;

/// Set up the global logger.
///
/// `RUST_LOG` overrides the default level. If the log file cannot be
/// opened, output falls back to stderr.
pub fn init_with(log_file: Option<&Path>, verbose: bool) {
    let target = log_file
        .and_then(|path| {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).ok()?;
            }
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        })
        .map(|file| Target::Pipe(Box::new(file)))
        .unwrap_or(Target::Stderr);

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(target)
        .try_init();
}
