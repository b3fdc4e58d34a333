// DANS : src/monitoring/logging.rs
use std::str::FromStr;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const FORMAT_VAR: &str = "LAUNCHPAD_LOG_FORMAT";

/// Rendu des logs. JSON pour les machines, `pretty` pour un terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("format de log inconnu '{other}' (json ou pretty)")),
        }
    }
}

/// Installe le subscriber global. `RUST_LOG` pilote le filtre ("info" par défaut),
/// `LAUNCHPAD_LOG_FORMAT` le rendu.
///
/// Les logs partent sur stderr : stdout reste réservé aux snapshots et
/// signatures que les binaires impriment (`scan_pools --json | jq`).
pub fn setup_logging() {
    let format = std::env::var(FORMAT_VAR)
        .ok()
        .and_then(|raw| raw.parse().map_err(|e| eprintln!("{e}")).ok())
        .unwrap_or_default();
    setup_logging_with(format, "info");
}

pub fn setup_logging_with(format: LogFormat, default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    // `try_init` : un second appel (tests, binaires qui s'enchaînent) ne panique pas.
    let _ = match format {
        LogFormat::Json => builder.json().with_span_events(FmtSpan::CLOSE).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn repeated_setup_does_not_panic() {
        setup_logging_with(LogFormat::Pretty, "debug");
        setup_logging_with(LogFormat::Json, "info");
    }
}
