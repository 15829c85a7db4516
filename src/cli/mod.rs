//! Command-line interface

pub mod commands;
pub mod output;
pub mod types;

pub use output::progress::{create_progress_bar, ProgressBarExt};
pub use output::{output, CommandOutput};
pub use types::{Cli, Commands, RunArgs};

/// Print `err` with its causes and exit with status 1
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let value = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}
