#![deny(warnings)]

//! Headless CLI: load a forecast, apply a shock scenario, print and export
//! the rollups.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use report::{describe_factors, format_money, render_top, Report};
use rollup::Dimension;
use scenario_core::{DateWindow, Shock};
use scenario_econ::MissingPolicy;
use scenario_runtime::{ScenarioConfig, Session};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: scenario (--input <file.xlsx|file.csv> | --synthetic <rows> [--seed <n>])
                [--scenario <file.yaml>] [--from <date>] [--to <date>]
                [--country <name>] [--material-group <name>]
                [--reset] [--shock <key>=<pct>]... [--zero-fill]
                [--top <n>] [--export <file.json|file.csv>] [--version]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    input: Option<PathBuf>,
    synthetic: Option<usize>,
    seed: u64,
    scenario: Option<PathBuf>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    country: Option<String>,
    material_group: Option<String>,
    reset: bool,
    shocks: Vec<(Shock, f64)>,
    zero_fill: bool,
    top: usize,
    export: Option<PathBuf>,
    version: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    data_pipeline::parse_date_text(s).with_context(|| format!("invalid date `{s}`"))
}

fn parse_shock(s: &str) -> Result<(Shock, f64)> {
    let (key, pct) = s
        .split_once('=')
        .with_context(|| format!("expected <key>=<pct>, got `{s}`"))?;
    let shock = Shock::from_key(key.trim())?;
    let pct: f64 = pct
        .trim()
        .trim_end_matches('%')
        .parse()
        .with_context(|| format!("invalid percentage in `{s}`"))?;
    Ok((shock, pct))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut a = Args {
        seed: 42,
        top: 10,
        ..Args::default()
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("missing value for {arg}"));
        match arg.as_str() {
            "--input" => a.input = Some(value()?.into()),
            "--synthetic" => a.synthetic = Some(value()?.parse().context("--synthetic")?),
            "--seed" => a.seed = value()?.parse().context("--seed")?,
            "--scenario" => a.scenario = Some(value()?.into()),
            "--from" => a.from = Some(parse_date(&value()?)?),
            "--to" => a.to = Some(parse_date(&value()?)?),
            "--country" => a.country = Some(value()?),
            "--material-group" => a.material_group = Some(value()?),
            "--shock" => a.shocks.push(parse_shock(&value()?)?),
            "--top" => a.top = value()?.parse().context("--top")?,
            "--export" => a.export = Some(value()?.into()),
            "--reset" => a.reset = true,
            "--zero-fill" => a.zero_fill = true,
            "--version" => a.version = true,
            "-h" | "--help" => bail!("{USAGE}"),
            other => bail!("unknown argument `{other}`\n{USAGE}"),
        }
    }
    Ok(a)
}

/// Scenario file first, then command-line overrides.
fn build_config(args: &Args) -> Result<ScenarioConfig> {
    let mut cfg = match &args.scenario {
        Some(p) => ScenarioConfig::load(p)
            .with_context(|| format!("loading scenario {}", p.display()))?,
        None => ScenarioConfig::default(),
    };
    cfg.window = DateWindow::new(args.from.or(cfg.window.from), args.to.or(cfg.window.to))?;
    if args.country.is_some() {
        cfg.filter.country = args.country.clone();
    }
    if args.material_group.is_some() {
        cfg.filter.material_group = args.material_group.clone();
    }
    if args.zero_fill {
        cfg.missing_policy = MissingPolicy::ZeroFill;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!("scenario {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"));
        return Ok(());
    }
    info!(input = ?args.input, synthetic = ?args.synthetic, scenario = ?args.scenario, "starting CLI");

    let rows = match (&args.input, args.synthetic) {
        (Some(path), _) => data_pipeline::load(path)
            .with_context(|| format!("could not load {}", path.display()))?,
        (None, Some(n)) => data_pipeline::synth::generate(n, args.seed),
        (None, None) => bail!("no dataset given\n{USAGE}"),
    };
    let cfg = build_config(&args)?;
    let mut session = Session::with_config(rows, &cfg)?;

    let controls = session.controls_mut();
    if args.reset {
        controls.reset_to_zero();
    }
    for (shock, pct) in &args.shocks {
        controls.set(*shock, *pct)?;
    }
    let out = session.run_simulation()?;
    let s = &out.summary;

    println!("Scenario | {}", describe_factors(&out.factors));
    println!(
        "Rows | simulated: {} | dated: {} | in rollups: {}",
        s.rows,
        s.dated_rows,
        out.rollups.by_country.iter().map(|b| b.rows).sum::<usize>()
    );
    println!(
        "KPI | baseline: ${} | simulated: ${} | revenue impact: ${} ({}) | profit impact: ${}",
        format_money(s.sales_value),
        format_money(s.sim_revenue_final),
        format_money(s.revenue_impact),
        s.revenue_impact_pct
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:+.2}%")),
        format_money(s.profit_impact),
    );
    for dim in Dimension::ALL {
        println!();
        print!("{}", render_top(dim, out.rollups.get(dim), args.top));
    }

    if let Some(path) = &args.export {
        let report = Report {
            factors: &out.factors,
            summary: &out.summary,
            rollups: &out.rollups,
        };
        report::export(path, &report).with_context(|| format!("exporting {}", path.display()))?;
        println!("\nExported to {}", path.display());
    }

    Ok(())
}
