//! Terminal output for reconciled and stored records.

use anyhow::{Context, Result};
use clap::ValueEnum;
use num_format::{Locale, ToFormattedString};
use receipt_client::{ReceiptGuess, Snapshot};
use receipt_core::{AggregateState, ExpenseRecord};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Two decimals with thousands separators: `1,234.50`.
pub fn format_money(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{sign}{}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

pub fn render_state(state: &AggregateState, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(&state.records, state.total, out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, state).context("serialize records")?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Csv => write_csv(&state.records, out),
    }
}

pub fn render_snapshot(
    snap: &Snapshot,
    currency: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let state = AggregateState {
        records: snap.records.iter().map(|r| r.to_expense(currency)).collect(),
        total: snap.total,
    };
    render_state(&state, format, out)
}

pub fn render_guess(guess: &ReceiptGuess, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "Preview: {} | {} | {} {}",
        guess.merchant,
        guess.date.as_deref().unwrap_or("no date"),
        format_money(guess.amount),
        guess.currency.as_deref().unwrap_or("")
    )?;
    Ok(())
}

fn write_table(records: &[ExpenseRecord], total: f64, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Total expense:   {}", format_money(total))?;
    writeln!(out, "Items processed: {}\n", records.len())?;

    if records.is_empty() {
        writeln!(out, "No entries found.")?;
        return Ok(());
    }

    for r in records {
        writeln!(
            out,
            "[{}] {:<28} {:<12} {:>12} {:<4} {}",
            r.initial(),
            truncate(&r.store, 28),
            truncate(&r.date, 12),
            format_money(r.amount),
            r.currency,
            r.category
        )?;
    }
    Ok(())
}

fn write_csv(records: &[ExpenseRecord], out: &mut impl Write) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(["store", "amount", "date", "category", "currency", "item"])?;
    for r in records {
        let amount = format!("{:.2}", r.amount);
        w.write_record([
            r.store.as_str(),
            amount.as_str(),
            r.date.as_str(),
            r.category.as_str(),
            r.currency.as_str(),
            r.item.as_deref().unwrap_or(""),
        ])?;
    }
    w.flush().context("flush csv")?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('…');
    t
}
