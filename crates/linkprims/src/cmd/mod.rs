use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use linkprims_link::{LinkHandle, LoopbackConfig, LoopbackLink};
use linkprims_reader::CollectRequest;

use crate::exit::{link_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod probe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a test payload and wait for the device to echo it back.
    Probe(ProbeArgs),
    /// Collect and print whatever the link delivers.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Which link to open. Exactly one source is required.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial port name (e.g. /dev/ttyACM0, COM11).
    #[arg(long, conflicts_with_all = ["socket", "loopback"], required_unless_present_any = ["socket", "loopback"])]
    pub port: Option<String>,
    /// Serial baud rate.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Unix domain socket path.
    #[arg(long, conflicts_with_all = ["port", "loopback"])]
    pub socket: Option<PathBuf>,
    /// Use an in-memory echoing loopback link.
    #[arg(long, conflicts_with_all = ["port", "socket"])]
    pub loopback: bool,
    /// Cap each loopback read at N bytes.
    #[arg(long, value_name = "N", requires = "loopback")]
    pub loopback_chunk: Option<usize>,
}

/// Termination conditions for each collection call.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Per-collection timeout (e.g. 500ms, 2s).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Stop a collection once this many bytes are buffered.
    #[arg(long, default_value_t = linkprims_reader::DEFAULT_MAX_BYTES)]
    pub max_bytes: usize,
    /// Stop a collection at this byte (e.g. 0x0a, \n, c0).
    #[arg(long)]
    pub delimiter: Option<String>,
}

impl CollectArgs {
    pub fn request(&self) -> CliResult<CollectRequest> {
        if self.max_bytes == 0 {
            return Err(CliError::new(USAGE, "--max-bytes must be greater than zero"));
        }
        let mut request = CollectRequest::default()
            .with_timeout(parse_duration(&self.timeout)?)
            .with_max_bytes(self.max_bytes);
        if let Some(delimiter) = &self.delimiter {
            request = request.with_delimiter(parse_byte(delimiter)?);
        }
        Ok(request)
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub collect: CollectArgs,
    /// Length of the generated payload body, rounded up to a multiple of five.
    #[arg(long, default_value_t = 20)]
    pub length: usize,
    /// SLIP-encode the payload and decode the echo.
    #[arg(long)]
    pub slip: bool,
    /// Keep an unterminated tail and prepend it to the next snapshot.
    #[arg(long, requires = "slip")]
    pub carry_over: bool,
    /// Give up when the echo is incomplete after this long.
    #[arg(long, default_value = "12s")]
    pub deadline: String,
    /// Bounded wait for the reader to confirm it stopped.
    #[arg(long, default_value = "1s")]
    pub stop_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub collect: CollectArgs,
    /// Decode SLIP frames instead of printing raw snapshots.
    #[arg(long)]
    pub slip: bool,
    /// Keep an unterminated tail and prepend it to the next snapshot.
    #[arg(long, requires = "slip")]
    pub carry_over: bool,
    /// Exit after N non-empty collections.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after listening for this long (e.g. 30s).
    #[arg(long = "for", value_name = "DURATION")]
    pub duration: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details and enabled features.
    #[arg(long)]
    pub extended: bool,
}

pub fn open_link(args: &LinkArgs) -> CliResult<LinkHandle> {
    if args.loopback {
        let config = LoopbackConfig {
            max_read: args.loopback_chunk.filter(|n| *n > 0),
            ..LoopbackConfig::default()
        };
        return Ok(Arc::new(LoopbackLink::with_config("loopback", config)));
    }

    if let Some(path) = &args.socket {
        return open_socket(path);
    }

    match &args.port {
        Some(port) => open_serial(port, args.baud),
        None => Err(CliError::usage(
            "one of --port, --socket or --loopback is required",
        )),
    }
}

#[cfg(unix)]
fn open_socket(path: &std::path::Path) -> CliResult<LinkHandle> {
    let link = linkprims_link::StreamLink::connect(path)
        .map_err(|err| link_error("socket connect failed", err))?;
    Ok(Arc::new(link))
}

#[cfg(not(unix))]
fn open_socket(_path: &std::path::Path) -> CliResult<LinkHandle> {
    Err(CliError::usage("--socket is only supported on unix"))
}

#[cfg(feature = "serial")]
fn open_serial(port: &str, baud: u32) -> CliResult<LinkHandle> {
    let config = linkprims_link::SerialConfig {
        baud_rate: baud,
        ..linkprims_link::SerialConfig::default()
    };
    let link = linkprims_link::SerialLink::open(port, &config)
        .map_err(|err| link_error("serial open failed", err))?;
    Ok(Arc::new(link))
}

#[cfg(not(feature = "serial"))]
fn open_serial(port: &str, _baud: u32) -> CliResult<LinkHandle> {
    Err(CliError::usage(format!(
        "cannot open {port}: built without the `serial` feature"
    )))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse a delimiter byte: `\n`/`\r`/`\t`, hex (`0x0a`, `c0`) or a single character.
pub fn parse_byte(input: &str) -> CliResult<u8> {
    match input {
        "\\n" => return Ok(b'\n'),
        "\\r" => return Ok(b'\r'),
        "\\t" => return Ok(b'\t'),
        "\\0" => return Ok(0),
        _ => {}
    }

    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if hex.len() == 2 {
        if let Ok(byte) = u8::from_str_radix(hex, 16) {
            return Ok(byte);
        }
    }

    match input.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(CliError::usage(format!("invalid delimiter byte: {input}"))),
    }
}

/// Build the echo test payload: five-character segments `x___5`, `x__10`, ...
/// up to `length`, terminated by `\n`. Returns the payload and its last segment.
pub fn test_payload(length: usize) -> (Vec<u8>, String) {
    let mut payload = String::with_capacity(length + 6);
    let mut last = String::new();
    for i in (0..length.max(1)).step_by(5) {
        last = format!("x{:>4}", i + 5).replace(' ', "_");
        payload.push_str(&last);
    }
    payload.push('\n');
    (payload.into_bytes(), last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_byte_forms() {
        assert_eq!(parse_byte("\\n").unwrap(), b'\n');
        assert_eq!(parse_byte("0x0a").unwrap(), b'\n');
        assert_eq!(parse_byte("c0").unwrap(), 0xC0);
        assert_eq!(parse_byte(";").unwrap(), b';');
        assert_eq!(parse_byte("abc").unwrap_err().code, USAGE);
    }

    #[test]
    fn payload_segments_are_right_aligned() {
        let (payload, last) = test_payload(20);
        assert_eq!(payload, b"x___5x__10x__15x__20\n");
        assert_eq!(last, "x__20");
    }

    #[test]
    fn payload_rounds_up_to_segment() {
        let (payload, last) = test_payload(7);
        assert_eq!(payload, b"x___5x__10\n");
        assert_eq!(last, "x__10");
    }

    #[test]
    fn zero_max_bytes_is_usage_error() {
        let args = CollectArgs {
            timeout: "1s".into(),
            max_bytes: 0,
            delimiter: None,
        };
        assert_eq!(args.request().unwrap_err().code, USAGE);
    }

    #[test]
    fn loopback_link_opens() {
        let args = LinkArgs {
            port: None,
            baud: 115_200,
            socket: None,
            loopback: true,
            loopback_chunk: Some(4),
        };
        let link = open_link(&args).unwrap();
        assert_eq!(link.name(), "loopback");
        assert!(link.is_open());
    }
}
