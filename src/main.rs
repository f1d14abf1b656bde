use geocapture::api::formatting::render;
use geocapture::{
    CaptureConfig, CaptureResult, CaptureSession, ConfigurationManager, GeoidCorrector, LogLevel,
    MockLocationSource, OutputFormat, RawFix, ReducedCoordinate,
};
use log::{info, warn};

const USAGE: &str = "Usage: geocapture <fixes.json> [--config <file>] [--format text|json|csv]
   or: geocapture --geoid <lat> <lon>";

/// Parsed command line
#[derive(Debug, PartialEq)]
enum Command {
    Capture {
        fixes_path: String,
        config_path: Option<String>,
        format: Option<OutputFormat>,
    },
    Geoid {
        lat: f64,
        lon: f64,
    },
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    if args.first().map(String::as_str) == Some("--geoid") {
        if args.len() != 3 {
            return Err("--geoid takes <lat> <lon>".to_string());
        }
        let lat = args[1].parse::<f64>().map_err(|e| format!("latitude: {}", e))?;
        let lon = args[2].parse::<f64>().map_err(|e| format!("longitude: {}", e))?;
        return Ok(Command::Geoid { lat, lon });
    }

    let mut fixes_path = None;
    let mut config_path = None;
    let mut format = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(iter.next().ok_or("--config needs a file")?.clone());
            }
            "--format" => {
                let value = iter.next().ok_or("--format needs a value")?;
                format = Some(value.parse::<OutputFormat>()?);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            path if fixes_path.is_none() => fixes_path = Some(path.to_string()),
            extra => return Err(format!("unexpected argument {}", extra)),
        }
    }

    Ok(Command::Capture {
        fixes_path: fixes_path.ok_or("missing fixes file")?,
        config_path,
        format,
    })
}

fn init_logging(level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_level_filter());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

/// Replay recorded fixes through one capture window.
///
/// The window opens at the first fix's timestamp; fixes stamped after the
/// window closes are not delivered.
fn capture_recorded(fixes: Vec<RawFix>, config: &CaptureConfig) -> CaptureResult<ReducedCoordinate> {
    let start_ms = fixes.first().map(|f| f.timestamp_ms).unwrap_or(0);
    let window_ms = u64::from(config.window_secs) * 1000;
    let end_ms = start_ms.saturating_add(window_ms);

    let total = fixes.len();
    let in_window: Vec<RawFix> = fixes
        .into_iter()
        .filter(|f| f.timestamp_ms < end_ms)
        .collect();
    if in_window.len() < total {
        warn!("{} fixes fall outside the {}s window", total - in_window.len(), config.window_secs);
    }

    let source = MockLocationSource::with_fixes(in_window);
    let mut session = CaptureSession::new(config.clone(), Box::new(source));
    session.start_window(start_ms)?;
    match session.poll(end_ms) {
        Some(result) => result,
        None => session.finish_now(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return Err("Invalid arguments".into());
        }
    };

    match command {
        Command::Geoid { lat, lon } => {
            init_logging(LogLevel::Warn);
            let undulation = GeoidCorrector::egm96().checked_undulation(lat, lon)?;
            println!("EGM96 undulation at ({}, {}): {:.3} m", lat, lon, undulation);
        }
        Command::Capture {
            fixes_path,
            config_path,
            format,
        } => {
            let manager = match &config_path {
                Some(path) => ConfigurationManager::from_file(path)?,
                None => ConfigurationManager::new(),
            };
            let config = manager.get_config().clone();
            init_logging(config.log_level);

            let validation = ConfigurationManager::validate_config(&config);
            for warning in &validation.warnings {
                warn!("config: {}", warning);
            }
            if let Some(error) = validation.errors.into_iter().next() {
                return Err(error.into());
            }

            let json_data = std::fs::read_to_string(&fixes_path)?;
            let fixes: Vec<RawFix> = serde_json::from_str(&json_data)?;
            info!("loaded {} fixes from {}", fixes.len(), fixes_path);

            match capture_recorded(fixes, &config) {
                Ok(coord) => {
                    println!("{}", render(&coord, format.unwrap_or(config.output_format)));
                }
                Err(e) => {
                    eprintln!("Capture failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
