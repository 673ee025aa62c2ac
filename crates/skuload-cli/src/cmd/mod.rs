//! Subcommands

pub mod check;
pub mod load;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

/// `skuload config`: effective settings after file loading
pub fn print_config(config: &Config) {
    let p = config.pipeline();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let source = config
        .loaded_from
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    table.add_row(vec!["Config file", &source]);
    table.add_row(vec!["Source URL", &p.url]);
    table.add_row(vec!["Database", &p.db_path.display().to_string()]);
    table.add_row(vec!["Chunk size", &p.chunk_size.to_string()]);
    table.add_row(vec![
        "Workers",
        &format!("{} (queue: {})", p.workers, p.queue_capacity),
    ]);
    table.add_row(vec!["Rows per INSERT", &p.insert_batch_size.to_string()]);
    table.add_row(vec![
        "Connect / read timeout",
        &format!(
            "{}s / {}s",
            p.http.connect_timeout.as_secs(),
            p.http.read_timeout.as_secs()
        ),
    ]);
    table.add_row(vec![
        "Max retries",
        &format!(
            "{} (backoff from {}ms)",
            p.http.max_retries,
            p.http.backoff_base.as_millis()
        ),
    ]);
    table.add_row(vec![
        "Log file",
        &config
            .log
            .file()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| "disabled".to_string()),
    ]);

    eprintln!("\n{table}");
}
