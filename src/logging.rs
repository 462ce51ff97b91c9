use chrono::Local;
use log::LevelFilter;
use simplelog::{self, CombinedLogger, WriteLogger};
use std::fs::OpenOptions;
use std::io::Write;

/// Sets up logging to file
///
/// # Arguments
///
/// * `log_level` - The level of log messages to capture
/// * `log_file` - Optional path to log file. If None, creates a timestamped file
///
/// # Returns
///
/// The path to the created log file
pub fn setup_logging(log_level: LevelFilter, log_file: Option<&str>) -> std::io::Result<String> {
    // Create a timestamp for the log file
    let timestamp = Local::now().format("%Y%m%d_%H").to_string();

    // Determine log file path
    let log_path = match log_file {
        Some(path) => path.to_string(),
        None => format!("outlook_mcp_{}.log", timestamp),
    };

    // Create the log file with append mode and write header in one operation
    let mut log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    writeln!(
        log_file,
        "====== OUTLOOK MCP SERVER LOG - Started at {} ======",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;

    // Use the default config for simplicity - explicitly use simplelog::Config to avoid ambiguity
    let log_config = simplelog::Config::default();

    // stdout is the MCP transport, so file logging is the only safe default
    CombinedLogger::init(vec![WriteLogger::new(log_level, log_config, log_file)])
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    log::info!("Logging initialized to file: {}", log_path);
    log::debug!("Debug logging enabled");

    Ok(log_path)
}
