//! Command-line demo: allocate a portfolio from a CSV of historical
//! returns (header row of tickers, one row per observation).
//!
//! ```text
//! portopt-rs <returns.csv> <method> [risk_level] [max_weight]
//! ```

use std::env;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use portopt_rs::allocate_with_strategy;
use portopt_rs::ReturnsMatrix;
use portopt_rs::Strategy;

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let args: Vec<String> = env::args().collect();
  if args.len() < 3 {
    bail!("usage: portopt-rs <returns.csv> <markowitz|risk_parity|hrp|cvar> [risk_level] [max_weight]");
  }

  let path = &args[1];
  let strategy: Strategy = args[2].parse()?;
  let risk_level: f64 = match args.get(3) {
    Some(raw) => raw.parse().context("risk_level must be a number")?,
    None => 0.25,
  };
  let max_weight: f64 = match args.get(4) {
    Some(raw) => raw.parse().context("max_weight must be a number")?,
    None => 1.0,
  };

  let returns = read_returns_csv(path)?;
  let allocation = allocate_with_strategy(strategy, &returns, risk_level, max_weight)?;

  println!("Optimal portfolio ({strategy:?}):");
  for (ticker, weight) in &allocation.weights {
    println!("  {ticker:>8}  {weight:.6}");
  }
  println!("  {:>8}  {:.6}", "total", allocation.total());

  Ok(())
}

/// Parse a header-plus-rows CSV of returns into a [`ReturnsMatrix`].
fn read_returns_csv(path: &str) -> Result<ReturnsMatrix> {
  let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
  let mut lines = BufReader::new(file).lines();

  let header = match lines.next() {
    Some(line) => line?,
    None => bail!("{path} is empty"),
  };
  let tickers: Vec<String> = header
    .split(',')
    .map(|t| t.trim().to_string())
    .collect();

  let mut rows = Vec::new();
  for (lineno, line) in lines.enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    let row: Vec<f64> = line
      .split(',')
      .map(|cell| {
        cell
          .trim()
          .parse::<f64>()
          .with_context(|| format!("bad value {:?} on data row {}", cell.trim(), lineno + 1))
      })
      .collect::<Result<_>>()?;
    rows.push(row);
  }

  Ok(ReturnsMatrix::from_rows(tickers, rows)?)
}
