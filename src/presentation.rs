//! Presentation settings and a plain-text rendering of the report
//!
//! Chart drawing happens outside this crate. What lives here is the
//! process-wide styling the charts are drawn with (palette, number
//! separators) and a text renderer used by the command-line tool.

use crate::aggregate::{Availability, SkipReason};
use crate::dashboard::DashboardReport;
use num_format::{CustomFormat, Grouping, Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Palette shared by every chart
pub const DEFAULT_PALETTE: [&str; 6] = ["#8A3FFC", "#FF8C00", "#A076F9", "#FFB74D", "#D946EF", "#FF7043"];

/// Styling handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationConfig {
    pub palette: Vec<String>,
    /// pt-BR uses ',' for decimals
    pub decimal_separator: char,
    /// pt-BR uses '.' for thousands
    pub thousands_separator: char,
    /// Chart height in pixels
    pub chart_height: u32,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            decimal_separator: ',',
            thousands_separator: '.',
            chart_height: 450,
        }
    }
}

impl PresentationConfig {
    /// Palette color for the n-th series, cycling
    pub fn color_for(&self, index: usize) -> Option<&str> {
        if self.palette.is_empty() {
            return None;
        }
        Some(self.palette[index % self.palette.len()].as_str())
    }

    /// Format a number with grouped thousands and a fixed number of decimals
    pub fn format_number(&self, value: f64, decimals: usize) -> String {
        let formatted = format!("{:.*}", decimals, value.abs());
        let (integer, fraction) = match formatted.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (formatted.as_str(), None),
        };

        let mut out = String::with_capacity(formatted.len() + integer.len() / 3 + 1);
        if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
            out.push('-');
        }
        match integer.parse::<u64>() {
            Ok(whole) => out.push_str(&self.group_thousands(whole)),
            Err(_) => out.push_str(integer),
        }
        if let Some(fraction) = fraction {
            out.push(self.decimal_separator);
            out.push_str(fraction);
        }
        out
    }

    fn group_thousands(&self, whole: u64) -> String {
        let format = CustomFormat::builder()
            .grouping(Grouping::Standard)
            .separator(self.thousands_separator.to_string())
            .build();
        match format {
            Ok(format) => whole.to_formatted_string(&format),
            Err(_) => whole.to_formatted_string(&Locale::pt),
        }
    }

    /// Indicator value, or "N/D" when it is not positive
    fn format_indicator(&self, value: f64, decimals: usize) -> String {
        if value > 0.0 {
            self.format_number(value, decimals)
        } else {
            "N/D".to_string()
        }
    }
}

fn placeholder(out: &mut String, reason: SkipReason) -> fmt::Result {
    writeln!(out, "  (no data: {})", reason)
}

/// Render the report as plain text, one section per indicator group and chart
pub fn render_text(report: &DashboardReport, config: &PresentationConfig) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_report(&mut out, report, config)?;
    Ok(out)
}

fn write_report(out: &mut String, report: &DashboardReport, config: &PresentationConfig) -> fmt::Result {
    let selection = &report.selection;

    writeln!(
        out,
        "Period {} to {}",
        selection.start_month().format("%Y-%m"),
        selection.end_month().format("%Y-%m")
    )?;

    if !report.has_data() {
        return writeln!(out, "\n{}", SkipReason::NoRows);
    }

    let ind = &report.indicators;
    writeln!(out, "\nKey indicators")?;
    writeln!(out, "  Total benefits:          {}", config.format_number(ind.total_benefits, 0))?;
    writeln!(out, "  Covered population:      {}", config.format_indicator(ind.covered_population, 0))?;
    writeln!(out, "  Rate (per 100k):         {}", config.format_indicator(ind.overall_rate, 2))?;
    writeln!(out, "  Months in filter:        {}", ind.distinct_months)?;

    let charts = &report.charts;

    writeln!(out, "\nBenefits by region (%)")?;
    match &charts.by_region {
        Availability::Available(shares) => {
            for row in &shares.rows {
                writeln!(
                    out,
                    "  {:<24} {:>14} {:>7}%",
                    row.region,
                    config.format_number(row.benefits, 0),
                    config.format_number(row.share_pct, 1)
                )?;
            }
            writeln!(
                out,
                "  Largest: {} ({}%)",
                shares.leader,
                config.format_number(shares.leader_pct.round(), 0)
            )?;
        }
        Availability::Unavailable(reason) => placeholder(out, *reason)?,
    }

    writeln!(out, "\nBenefits by type")?;
    match &charts.by_type {
        Availability::Available(rows) => {
            for row in rows {
                writeln!(out, "  {:<40} {:>14}", row.benefit_type, config.format_number(row.benefits, 0))?;
            }
        }
        Availability::Unavailable(reason) => placeholder(out, *reason)?,
    }

    writeln!(out, "\nPareto by beneficiary status")?;
    match &charts.pareto_by_status {
        Availability::Available(rows) => {
            for row in rows {
                writeln!(
                    out,
                    "  {:<24} {:>14} {:>7}%",
                    row.status,
                    config.format_number(row.benefits, 0),
                    config.format_number(row.cumulative_pct, 0)
                )?;
            }
        }
        Availability::Unavailable(reason) => placeholder(out, *reason)?,
    }

    writeln!(out, "\nDistribution by age bracket")?;
    match &charts.by_age_bracket {
        Availability::Available(rows) => {
            for row in rows {
                writeln!(out, "  {:<24} {:>14}", row.age_bracket, config.format_number(row.benefits, 0))?;
            }
        }
        Availability::Unavailable(reason) => placeholder(out, *reason)?,
    }

    writeln!(out, "\nRate by region (per 100k)")?;
    match &charts.rate_by_region {
        Availability::Available(rows) => {
            for row in rows {
                writeln!(out, "  {:<24} {:>14}", row.region, config.format_number(row.rate, 2))?;
            }
        }
        Availability::Unavailable(reason) => placeholder(out, *reason)?,
    }

    writeln!(out, "\nRate by month and sex (per 100k)")?;
    match &charts.rate_by_month_sex {
        Availability::Available(rates) => {
            for row in &rates.rows {
                writeln!(
                    out,
                    "  {:<8} {:<16} {:>14}",
                    row.month_key,
                    row.sex,
                    config.format_number(row.rate, 2)
                )?;
            }
        }
        Availability::Unavailable(reason) => placeholder(out, *reason)?,
    }

    Ok(())
}
