use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use ugvlink_client::{
    ClientError, DecodeOptions, LengthOrder, LinkConfig, MoveOutcome, SerialTransport, Session,
    SessionConfig, Setpoints, TelemetryKind, TelemetryReading,
};
use ugvlink_slave::{BatteryStatus, Slave, SlaveConfig};

#[derive(Parser)]
#[command(
    name = "ugvlink",
    version,
    about = "Command a UGV over its serial radio link"
)]
struct Cli {
    #[command(flatten)]
    link: LinkArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LinkArgs {
    /// Serial device. Defaults to the first /dev/ttyUSB* found.
    #[arg(long, global = true)]
    port: Option<String>,
    /// Serial speed.
    #[arg(long, global = true, default_value_t = ugvlink_client::state::DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Vehicle id (the slave's id when simulating).
    #[arg(short = 'r', long, global = true, default_value_t = 1)]
    robot_id: u8,
    /// READY attempts before giving up on the vehicle.
    #[arg(long, global = true, default_value_t = ugvlink_client::state::DEFAULT_HANDSHAKE_ATTEMPTS)]
    handshake_attempts: u32,
    /// Longest gap allowed between bytes of one frame.
    #[arg(long, global = true, default_value_t = 500)]
    byte_timeout_ms: u64,
    /// How long to wait for the start of a response.
    #[arg(long, global = true, default_value_t = 100)]
    sync_timeout_ms: u64,
    /// Read inbound length fields high byte first (older firmware).
    #[arg(long, global = true)]
    legacy_length_order: bool,
    /// Longest payload accepted from the peer; longer frames are dropped.
    #[arg(long, global = true, default_value_t = 255)]
    max_payload: usize,
}

impl LinkArgs {
    fn link_config(&self) -> LinkConfig {
        LinkConfig {
            port: self.port.clone(),
            baud_rate: self.baud,
        }
    }

    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            sync_timeout: Duration::from_millis(self.sync_timeout_ms),
            byte_timeout: Duration::from_millis(self.byte_timeout_ms),
            length_order: if self.legacy_length_order {
                LengthOrder::Big
            } else {
                LengthOrder::Little
            },
            max_payload: self.max_payload,
        }
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            peer_id: self.robot_id,
            decode: self.decode_options(),
            handshake_attempts: self.handshake_attempts,
            ..SessionConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Open the link and check that the vehicle answers.
    Ping,
    /// Send one pair of wheel setpoints (0-255, 127 is stopped).
    #[command(allow_negative_numbers = true)]
    Move {
        right: f64,
        left: f64,
        /// Clamp out-of-range values instead of rejecting them.
        #[arg(long)]
        clamp: bool,
    },
    /// Drive at constant setpoints for a while, then stop.
    #[command(allow_negative_numbers = true)]
    Drive {
        right: f64,
        left: f64,
        /// How long to keep driving.
        #[arg(long)]
        seconds: f64,
        /// Clamp out-of-range values instead of rejecting them.
        #[arg(long)]
        clamp: bool,
    },
    /// Read battery telemetry.
    Telemetry {
        #[arg(value_enum, default_value_t = TelemetryArg::All)]
        kind: TelemetryArg,
    },
    /// Relay "<right> <left>" setpoint lines from stdin until EOF.
    Listen,
    /// Act as the vehicle on the serial port.
    Simulate {
        /// Report BATTERY_ERROR for every telemetry query.
        #[arg(long)]
        battery_fault: bool,
        /// State of charge to report, in percent.
        #[arg(long, default_value_t = BatteryStatus::default().state_of_charge)]
        state_of_charge: u16,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TelemetryArg {
    All,
    StateOfCharge,
    Voltage,
    RemainingCapacity,
    Temperature,
    Current,
}

impl TelemetryArg {
    fn kinds(self) -> Vec<TelemetryKind> {
        match self {
            Self::All => TelemetryKind::ALL.to_vec(),
            Self::StateOfCharge => vec![TelemetryKind::StateOfCharge],
            Self::Voltage => vec![TelemetryKind::Voltage],
            Self::RemainingCapacity => vec![TelemetryKind::RemainingCapacity],
            Self::Temperature => vec![TelemetryKind::Temperature],
            Self::Current => vec![TelemetryKind::Current],
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("install Ctrl-C handler")?;

    match cli.command {
        Command::Ping => {
            let session = connect(&cli.link)?;
            println!("vehicle {} ready", session.peer_id());
            finish(session);
        }
        Command::Move { right, left, clamp } => {
            let setpoints = setpoints(right, left, clamp)?;
            let mut session = connect(&cli.link)?;
            let outcome = session.move_wheels(setpoints).context("move")?;
            println!(
                "move ({}, {}): {}",
                setpoints.right,
                setpoints.left,
                describe_outcome(outcome)
            );
            finish(session);
        }
        Command::Drive {
            right,
            left,
            seconds,
            clamp,
        } => {
            let setpoints = setpoints(right, left, clamp)?;
            let duration = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("invalid duration: {seconds}"))?;
            let mut session = connect(&cli.link)?;
            let sent = drive(&mut session, setpoints, duration, &stop)?;
            println!("sent {sent} moves; {}", session.stats());
            finish(session);
        }
        Command::Telemetry { kind } => {
            let mut session = connect(&cli.link)?;
            for kind in kind.kinds() {
                let reading = match session.query(kind) {
                    Ok(reading) => reading,
                    Err(ClientError::NoResponse) => TelemetryReading::Unavailable,
                    Err(e) => return Err(e).context("telemetry query"),
                };
                println!("{kind}: {}", describe_reading(&reading));
            }
            finish(session);
        }
        Command::Listen => {
            let mut session = connect(&cli.link)?;
            listen(&mut session, &stop)?;
            finish(session);
        }
        Command::Simulate {
            battery_fault,
            state_of_charge,
        } => simulate(&cli.link, battery_fault, state_of_charge, &stop)?,
    }
    Ok(())
}

/// Open the link and complete the handshake.
fn connect(args: &LinkArgs) -> Result<Session<SerialTransport>> {
    let mut session = Session::open(&args.link_config(), args.session_config())
        .context("open serial link")?;
    session
        .handshake()
        .with_context(|| format!("contact vehicle {}", args.robot_id))?;
    Ok(session)
}

/// Stop the vehicle and report how it went. Never fails: the process is
/// exiting either way.
fn finish(session: Session<SerialTransport>) {
    match session.shutdown() {
        Ok(MoveOutcome::Accepted) => info!("vehicle stopped"),
        Ok(MoveOutcome::Rejected) => warn!("stop command not acknowledged"),
        Err(e) => warn!(error = %e, "stop command not confirmed"),
    }
}

fn setpoints(right: f64, left: f64, clamp: bool) -> Result<Setpoints> {
    if clamp {
        Ok(Setpoints::clamped(right, left))
    } else {
        Setpoints::try_from_f64(right, left).context("invalid setpoints")
    }
}

/// Repeat one Move until `duration` has passed or Ctrl-C. Returns the
/// number of moves sent.
fn drive<T: ugvlink_client::Transport>(
    session: &mut Session<T>,
    setpoints: Setpoints,
    duration: Duration,
    stop: &AtomicBool,
) -> Result<u64> {
    info!(right = setpoints.right, left = setpoints.left, ?duration, "driving");
    let started = Instant::now();
    let mut sent = 0;
    while started.elapsed() < duration && !stop.load(Ordering::Relaxed) {
        match session.move_wheels(setpoints) {
            Ok(_) => {}
            Err(ClientError::NoResponse) => warn!("move went unanswered"),
            Err(e) => return Err(e).context("move"),
        }
        sent += 1;
    }
    if stop.load(Ordering::Relaxed) {
        info!("interrupted");
    }
    Ok(sent)
}

fn listen<T: ugvlink_client::Transport>(session: &mut Session<T>, stop: &AtomicBool) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    // Detached: a blocked stdin read cannot be interrupted.
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    info!("relaying setpoints from stdin");
    while !stop.load(Ordering::Relaxed) {
        let line = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                break;
            }
        };
        let setpoints = match parse_line(&line) {
            Ok(Some(setpoints)) => setpoints,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = %line, error = %e, "skipping line");
                continue;
            }
        };
        match session.move_wheels(setpoints) {
            Ok(MoveOutcome::Accepted) => {}
            Ok(MoveOutcome::Rejected) => warn!(line = %line, "move rejected"),
            Err(ClientError::NoResponse) => warn!(line = %line, "move went unanswered"),
            Err(e) => return Err(e).context("move"),
        }
    }
    Ok(())
}

/// `"<right> <left>"`, whitespace separated. Blank lines and `#` comments
/// yield `None`.
fn parse_line(line: &str) -> Result<Option<Setpoints>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [right, left] = fields.as_slice() else {
        bail!("expected two setpoints, got {}", fields.len());
    };
    let right: f64 = right.parse().with_context(|| format!("bad number: {right}"))?;
    let left: f64 = left.parse().with_context(|| format!("bad number: {left}"))?;
    Ok(Some(Setpoints::try_from_f64(right, left)?))
}

fn simulate(
    args: &LinkArgs,
    battery_fault: bool,
    state_of_charge: u16,
    stop: &AtomicBool,
) -> Result<()> {
    let transport = SerialTransport::open_link(&args.link_config()).context("open serial link")?;
    let config = SlaveConfig {
        slave_id: args.robot_id,
        decode: args.decode_options(),
        battery: BatteryStatus {
            state_of_charge,
            ..BatteryStatus::default()
        },
        battery_fault,
        ..SlaveConfig::default()
    };
    let port = transport.path().to_owned();
    let mut slave = Slave::new(transport, config);
    info!(
        port = %port,
        slave_id = slave.config().slave_id,
        master_id = slave.config().master_id,
        "simulating vehicle"
    );
    slave.run(stop).context("simulated vehicle")?;
    println!(
        "served {} moves, last setpoints {:?}",
        slave.state().move_count(),
        slave.state().setpoints()
    );
    Ok(())
}

fn describe_outcome(outcome: MoveOutcome) -> &'static str {
    match outcome {
        MoveOutcome::Accepted => "accepted",
        MoveOutcome::Rejected => "rejected",
    }
}

fn describe_reading(reading: &TelemetryReading) -> String {
    match reading {
        TelemetryReading::Value { raw, .. } => match reading.as_u32() {
            Some(value) => value.to_string(),
            None => format!("raw {raw:02x?}"),
        },
        TelemetryReading::BatteryFault => "battery error".to_owned(),
        TelemetryReading::Unavailable => "unavailable".to_owned(),
    }
}
