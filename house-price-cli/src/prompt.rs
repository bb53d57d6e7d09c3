use anyhow::{bail, Context, Result};
use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use house_price_serve::FeatureRecord;
use serde_json::Value;
use std::io::{BufRead, Write};

/// Parse a JSON object of features.
pub fn parse_features(text: &str) -> Result<FeatureRecord> {
    let value: Value = serde_json::from_str(text).context("The JSON is not a valid JSON object")?;
    let Value::Object(object) = value else {
        bail!("The JSON is not a valid JSON object");
    };
    Ok(FeatureRecord::from_json(&object)?)
}

/// Ask for a JSON feature object until one parses and coerces.
pub fn ask_features<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<FeatureRecord> {
    loop {
        execute!(
            output,
            SetForegroundColor(Color::Cyan),
            Print("Give a JSON object with the features of the house: "),
            ResetColor
        )?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no features given (end of input)");
        }
        match parse_features(line.trim()) {
            Ok(record) => return Ok(record),
            Err(e) => execute!(
                output,
                SetForegroundColor(Color::Red),
                Print(format!("{:#}\n", e)),
                ResetColor
            )?,
        }
    }
}

/// `1234567.891` -> `$1,234,567.89`
pub fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if price < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
