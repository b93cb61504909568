use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{date_key, format_minutes};
use crate::plan::{DayRecord, DayStats, SLOT_COUNT, Slot, TaskChip};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// The five-slot board for one day.
    #[tracing::instrument(skip(self, record))]
    pub fn print_board(&mut self, date: NaiveDate, record: Option<&DayRecord>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", date_key(date))?;

        let headers = ["Slot", "Window", "Task", "Time"];
        let mut rows = Vec::with_capacity(SLOT_COUNT);

        for slot in Slot::ALL {
            let assignment = record.and_then(|day| day.get(&slot));

            let task = assignment
                .map(|a| format!("{} {}", a.emoji, a.task))
                .unwrap_or_else(|| "-".to_string());

            let time = match assignment {
                Some(a) if a.minutes > 0 => self.paint(&format_minutes(a.minutes), "32"),
                Some(a) => format_minutes(a.minutes),
                None => String::new(),
            };

            rows.push(vec![
                self.paint(slot.key(), "33"),
                slot.window().to_string(),
                task,
                time,
            ]);
        }

        write_table(&mut out, &headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, date: NaiveDate, stats: &DayStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "date        {}", date_key(date))?;
        writeln!(
            out,
            "total time  {}",
            format_minutes(stats.total_minutes)
        )?;
        writeln!(
            out,
            "slots used  {}/{}",
            stats.busy_slots, SLOT_COUNT
        )?;
        writeln!(out, "efficiency  {}%", stats.efficiency)?;

        Ok(())
    }

    #[tracing::instrument(skip(self, chips))]
    pub fn print_palette(&mut self, chips: &[TaskChip]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for chip in chips {
            writeln!(out, "{} {}", chip.emoji, chip.name)?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(*header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

// Emoji chips make cells wider than their char count; widths are
// measured on the ANSI-stripped text.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
