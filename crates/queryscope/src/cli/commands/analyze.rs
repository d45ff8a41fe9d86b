use anyhow::{Context, Result};
use clap::Args;

use crate::scanner;

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &AnalyzeArgs) -> Result<()> {
    let suggestions = scanner::scan(&args.sql);

    if args.json {
        let encoded = serde_json::to_string_pretty(&suggestions)
            .context("failed to encode suggestions")?;
        println!("{encoded}");
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("analyze: query looks good (no anti-patterns detected)");
        return Ok(());
    }

    println!("analyze: {} suggestion(s)", suggestions.len());
    for suggestion in &suggestions {
        println!(
            "  [{}] {}: {}",
            suggestion.severity.as_str(),
            suggestion.suggestion_type.as_str(),
            suggestion.description
        );
    }

    Ok(())
}
