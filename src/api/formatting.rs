//! Reduced-coordinate output formatting
//!
//! Renders a [`ReducedCoordinate`] for display or hand-off to an external
//! consumer. These are presentation helpers, not export file encoders.

use crate::api::types::OutputFormat;
use crate::core::ReducedCoordinate;

/// Common interface of the coordinate renderers
pub trait CoordinateFormatter {
    /// Optional header preceding formatted rows
    fn header(&self) -> Option<String> {
        None
    }

    /// Render one coordinate
    fn format(&self, coord: &ReducedCoordinate) -> String;
}

/// Pick the formatter for an output format
pub fn formatter_for(format: OutputFormat) -> Box<dyn CoordinateFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::pretty()),
        OutputFormat::Csv => Box::new(CsvFormatter::new()),
    }
}

/// Render a coordinate including the header when the format has one
pub fn render(coord: &ReducedCoordinate, format: OutputFormat) -> String {
    let formatter = formatter_for(format);
    match formatter.header() {
        Some(header) => format!("{}\n{}", header, formatter.format(coord)),
        None => formatter.format(coord),
    }
}

/// Human-readable text formatter
pub struct TextFormatter {
    /// Decimal places for latitude/longitude
    pub precision: usize,
    /// Single-line output
    pub compact: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            precision: 6,
            compact: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a multi-line text formatter
    pub fn detailed() -> Self {
        Self {
            compact: false,
            ..Self::default()
        }
    }

    fn accuracy(coord: &ReducedCoordinate) -> String {
        coord
            .accuracy_m
            .map(|a| format!("±{:.1}m", a))
            .unwrap_or_else(|| "±?".to_string())
    }

    fn altitude(coord: &ReducedCoordinate) -> String {
        coord
            .orthometric_altitude_m
            .map(|h| format!("{}m", h.round() as i64))
            .unwrap_or_else(|| "---".to_string())
    }
}

impl CoordinateFormatter for TextFormatter {
    fn format(&self, coord: &ReducedCoordinate) -> String {
        let p = self.precision;
        if self.compact {
            return format!(
                "{:.p$}, {:.p$} {} MSL {}",
                coord.lat,
                coord.lon,
                Self::accuracy(coord),
                Self::altitude(coord),
                p = p
            );
        }

        let mut output = String::new();
        output.push_str(&format!("Latitude:   {:.p$}°\n", coord.lat, p = p));
        output.push_str(&format!("Longitude:  {:.p$}°\n", coord.lon, p = p));
        output.push_str(&format!("Accuracy:   {}\n", Self::accuracy(coord)));
        output.push_str(&format!("Altitude:   {} (MSL)\n", Self::altitude(coord)));
        output.push_str(&format!(
            "Samples:    {} kept of {} ({:?} pool)\n",
            coord.kept_count, coord.sample_count, coord.pool_tier
        ));
        output.push_str(&format!("Produced:   {}\n", coord.produced_at.to_rfc3339()));
        output
    }
}

/// JSON formatter for structured output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print JSON
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pretty-printing JSON formatter
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Format coordinate as JSON string
    pub fn format_json(&self, coord: &ReducedCoordinate) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(coord)
        } else {
            serde_json::to_string(coord)
        }
    }
}

impl CoordinateFormatter for JsonFormatter {
    fn format(&self, coord: &ReducedCoordinate) -> String {
        self.format_json(coord)
            .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// CSV formatter for data logging
pub struct CsvFormatter {
    /// Field separator
    pub delimiter: char,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvFormatter {
    /// Create a new CSV formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab-separated variant
    pub fn tsv() -> Self {
        Self { delimiter: '\t' }
    }
}

impl CoordinateFormatter for CsvFormatter {
    fn header(&self) -> Option<String> {
        let fields = [
            "produced_at_ms",
            "latitude",
            "longitude",
            "accuracy_m",
            "msl_altitude_m",
            "samples",
            "kept",
            "pool",
        ];
        Some(fields.join(&self.delimiter.to_string()))
    }

    fn format(&self, coord: &ReducedCoordinate) -> String {
        let fields = [
            coord.produced_at_ms().to_string(),
            format!("{:.7}", coord.lat),
            format!("{:.7}", coord.lon),
            coord.accuracy_m.map(|a| format!("{:.1}", a)).unwrap_or_default(),
            coord
                .orthometric_altitude_m
                .map(|h| format!("{:.2}", h))
                .unwrap_or_default(),
            coord.sample_count.to_string(),
            coord.kept_count.to_string(),
            format!("{:?}", coord.pool_tier),
        ];
        fields.join(&self.delimiter.to_string())
    }
}
