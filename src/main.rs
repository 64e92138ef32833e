//! Benefit Dashboard CLI
//!
//! Loads the benefits table, applies the selected filters and prints the
//! indicators and chart tables as text or JSON.

use anyhow::{bail, Context, Result};
use benefit_dashboard::dataset::{parse_month_arg, DEFAULT_DATASET_PATH};
use benefit_dashboard::{Dashboard, FilterSelection, PresentationConfig, Selection};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "benefit-dashboard", version, about = "Granted benefits report for a date range, regions and CID categories")]
struct Args {
    /// Benefits table (CSV)
    #[arg(long, default_value = DEFAULT_DATASET_PATH)]
    data: PathBuf,

    /// First month (YYYY-MM or YYYY-MM-DD); defaults to the earliest month
    #[arg(long, value_parser = parse_month_arg)]
    start: Option<NaiveDate>,

    /// Last month (YYYY-MM or YYYY-MM-DD); defaults to the latest month
    #[arg(long, value_parser = parse_month_arg)]
    end: Option<NaiveDate>,

    /// Region to include (repeatable); all regions when omitted
    #[arg(long = "region", conflicts_with = "no_regions")]
    regions: Vec<String>,

    /// Deselect every region
    #[arg(long)]
    no_regions: bool,

    /// CID category to include (repeatable); all categories when omitted
    #[arg(long = "category", conflicts_with = "no_categories")]
    categories: Vec<String>,

    /// Deselect every CID category
    #[arg(long)]
    no_categories: bool,

    /// Print the available filter options and exit
    #[arg(long)]
    options: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn set_selection(values: Vec<String>, cleared: bool) -> Selection {
    if cleared {
        Selection::none()
    } else if values.is_empty() {
        Selection::All
    } else {
        Selection::subset(values)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dashboard = Dashboard::load(&args.data)
        .with_context(|| format!("Failed to load benefits table from {}", args.data.display()))?;

    if args.options {
        let options = dashboard.options();
        if args.json {
            println!("{}", serde_json::to_string_pretty(options)?);
        } else {
            let month = |m: Option<NaiveDate>| m.map(|d| d.format("%Y-%m").to_string()).unwrap_or_else(|| "-".into());
            println!("Months:     {} to {}", month(options.first_month), month(options.last_month));
            println!("Regions:    {}", options.regions.join(", "));
            println!("Categories: {}", options.categories.join(", "));
        }
        return Ok(());
    }

    let selection = FilterSelection::resolve(
        dashboard.options(),
        args.start,
        args.end,
        set_selection(args.regions, args.no_regions),
        set_selection(args.categories, args.no_categories),
    );
    let selection = match selection {
        Ok(selection) => selection,
        Err(e) => bail!("Invalid filter selection: {}", e),
    };

    let report = dashboard.compute(&selection)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", benefit_dashboard::presentation::render_text(&report, &PresentationConfig::default())?);
    }

    Ok(())
}
