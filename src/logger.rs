use env_logger::fmt::Formatter;
use log::{Level, Record};
use std::io::Write;
use chrono::Local;
use colored::*;

pub fn init_logger(log_level: &str) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level));
    builder.format(format_log);

    // Filter out logs from actix_server and actix_web
    builder.filter(Some("actix_server"), log::LevelFilter::Warn);
    builder.filter(Some("actix_web"), log::LevelFilter::Warn);
    builder.filter(Some("reqwest"), log::LevelFilter::Warn);

    builder.init();
}

fn format_log(buf: &mut Formatter, record: &Record) -> std::io::Result<()> {
    writeln!(buf, "{}", format_line(record.level(), &record.args().to_string()))
}

fn format_line(level: Level, message: &str) -> String {
    let level_style = match level {
        Level::Error => "ERROR".truecolor(255, 0, 0),
        Level::Warn => "WARN".truecolor(255, 165, 0),
        Level::Info => "INFO".truecolor(0, 255, 255),
        Level::Debug => "DEBUG".truecolor(138, 43, 226),
        Level::Trace => "TRACE".truecolor(255, 105, 180),
    };

    format!(
        "{} [{}] - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level_style,
        message
    )
}

pub fn print_banner(host: &str, port: u16, generator_ready: bool) {
    let pink = (255, 64, 129);
    let purple = (126, 87, 194);
    let cyan = (0, 230, 230);

    let border = "=".repeat(72);
    println!("{}", border.truecolor(purple.0, purple.1, purple.2));
    println!("{}", "   t u t o r l o o p".truecolor(pink.0, pink.1, pink.2).bold());
    println!("{}", "   interactive assessment sessions".truecolor(purple.0, purple.1, purple.2));
    println!();
    println!("{}", format!("   - Address:   http://{}:{}", host, port).truecolor(cyan.0, cyan.1, cyan.2));
    println!("{}", format!("   - Sessions:  ws://{}:{}/session", host, port).truecolor(cyan.0, cyan.1, cyan.2));
    if generator_ready {
        println!("{}", "   - Generator: connected".green());
    } else {
        println!("{}", "   - Generator: no API key, serving fallback content only".yellow());
    }
    println!("{}", border.truecolor(purple.0, purple.1, purple.2));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_contains_level_and_message() {
        colored::control::set_override(false);
        let line = format_line(Level::Warn, "quota reached");
        assert!(line.contains("[WARN]"));
        assert!(line.ends_with("- quota reached"));
    }
}
