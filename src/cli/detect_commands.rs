// Detect and inspect command implementations
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use market_regime::{
    load_series, Config, KrakenHistoricalClient, RegimeDetector, RegimeError, RegimeReport, RegimeResult, Spinner,
};

/// Command-line overrides for a detection run
pub struct DetectOptions {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    pub start: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub json: bool,
}

pub async fn run_detect(options: DetectOptions, config: &Config) -> RegimeResult<()> {
    let symbol = options.symbol.unwrap_or_else(|| config.data.symbol.clone());
    let interval = options.interval.unwrap_or_else(|| config.data.interval.clone());
    let start_raw = options.start.unwrap_or_else(|| config.data.start.clone());
    let start = NaiveDate::parse_from_str(&start_raw, "%Y-%m-%d").map_err(|e| {
        RegimeError::InvalidParameter("start".to_string(), format!("'{}' is not YYYY-MM-DD: {}", start_raw, e))
    })?;

    let series = match &options.input {
        Some(path) => {
            info!("📂 Loading {} bars from {}", symbol, path);
            load_series(path, &symbol, &interval)?
        }
        None => {
            let spinner = Spinner::new(&format!("Fetching {} {} history from Kraken...", symbol, interval));
            let mut client = KrakenHistoricalClient::with_base_url(&config.data.rest_url)
                .with_warmup_days(config.data.warmup_days);
            match client.fetch_series(&symbol, &interval, start).await {
                Ok(series) => {
                    spinner.finish(&format!("Loaded {} bars", series.len()));
                    series
                }
                Err(e) => {
                    spinner.finish_with_error("Fetch failed");
                    return Err(e.into());
                }
            }
        }
    };

    let detector = RegimeDetector::new(config.detector_config())?;
    let spinner = Spinner::new("Fitting regime model...");
    let report = match detector.detect(&series) {
        Ok(report) => {
            spinner.finish("Regimes detected");
            report
        }
        Err(e) => {
            spinner.finish_with_error("Detection failed");
            return Err(e);
        }
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if let Some(path) = &options.output {
        save_report(&report, path)?;
        info!("💾 Saved report to {}", path);
    }

    Ok(())
}

pub fn inspect_report(path: &str) -> RegimeResult<()> {
    let report = load_report(path)?;
    print_summary(&report);
    Ok(())
}

pub fn save_report<P: AsRef<Path>>(report: &RegimeReport, path: P) -> RegimeResult<()> {
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path.as_ref(), content)
        .map_err(|e| RegimeError::FileWrite(format!("{}: {}", path.as_ref().display(), e)))
}

pub fn load_report<P: AsRef<Path>>(path: P) -> RegimeResult<RegimeReport> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RegimeError::FileNotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_summary(report: &RegimeReport) {
    info!("📈 {} ({})", report.symbol, report.interval);
    if let (Some(first), Some(last)) = (report.series.first(), report.series.last()) {
        info!(
            "   Period: {} to {} ({} rows)",
            first.timestamp.format("%Y-%m-%d"),
            last.timestamp.format("%Y-%m-%d"),
            report.series.len()
        );
    }

    info!("🎯 Current regime: {}", report.current_regime);

    info!("🏷️  State labels:");
    for entry in report.labels.entries() {
        info!(
            "   state {} → {:<8} ({}) mean return {:+.4}%",
            entry.state,
            entry.label,
            entry.color.css_name(),
            entry.mean_return * 100.0
        );
    }

    info!("📊 Regime statistics:");
    for (label, stats) in report.regime_stats.iter() {
        match stats.mean_length {
            Some(mean) => info!("   {:<8} {:>3} segments, mean length {:.1}", label, stats.count, mean),
            None => info!("   {:<8} never observed", label),
        }
    }

    let model = &report.model;
    if model.converged {
        info!("✅ EM converged in {} iterations (log-likelihood {:.3})", model.iterations, model.log_likelihood);
    } else {
        warn!(
            "⚠️  EM hit the {}-iteration cap (log-likelihood {:.3})",
            model.iterations, model.log_likelihood
        );
    }

    if let Some(last) = report.segments.last() {
        info!(
            "   Latest segment: {} since {} ({} rows)",
            last.label,
            last.start.format("%Y-%m-%d"),
            last.length
        );
    }
}
