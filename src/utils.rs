use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

// --- SHARED SPINNER ---
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

// --- SHARED MESSAGES ---
pub fn print_info(msg: &str) {
    println!("{} {}", "i".cyan().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Stable colour per source so interleaved streams stay readable.
pub fn source_prefix(source: &str) -> ColoredString {
    let text = format!("[{source}]");
    match source.len() % 4 {
        0 => text.cyan(),
        1 => text.green(),
        2 => text.magenta(),
        _ => text.yellow(),
    }
    .bold()
}
