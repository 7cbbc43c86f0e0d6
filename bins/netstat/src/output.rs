//! Output selection for the netstat command.

use std::io::Write;

use clap::ValueEnum;
use netstat::{JsonSink, LineProtocolSink, Sink};

/// Output format for emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// InfluxDB line protocol, one record per line.
    Text,
    /// One JSON object per line.
    Json,
}

/// Build the sink for a format over a writer.
pub fn sink<'a, W: Write + 'a>(format: OutputFormat, writer: W) -> Box<dyn Sink + 'a> {
    match format {
        OutputFormat::Text => Box::new(LineProtocolSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
    }
}
