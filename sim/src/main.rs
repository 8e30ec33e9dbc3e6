//! CardBeacon simulator — sender and receiver on one host
//!
//! Runs the receiver scan pipeline on OS threads against simulated
//! airwaves. A sender thread broadcasts random cards the way the ESP32
//! sender does; a radio thread answers scan triggers with whatever is on
//! air. Card events and replies are printed to stdout as NDJSON, and
//! NDJSON host commands are read from stdin.
//!
//! ```text
//! RUST_LOG=debug CARDBEACON_RUN_SECS=30 cardbeacon-sim
//! echo '{"cmd":"history"}' | cardbeacon-sim
//! ```
//!
//! See `config.rs` for the `CARDBEACON_*` environment variables.

mod config;
mod radio;

use std::io::{self, BufRead, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;

use cardbeacon::comm::{self, LineReader, Reply};
use cardbeacon::history::CardHistory;
use cardbeacon::pipeline::{CardObserved, CardSink, ScanPipeline};
use cardbeacon::protocol::{HostCommand, MsgBuffer, VERSION};

use config::SimConfig;
use radio::{Air, SimRadio};

/// Input to the pipeline thread
enum Event {
    ResultsAvailable,
    Command(HostCommand),
    Shutdown,
}

type Pipeline = ScanPipeline<SimRadio, (CardHistory, OutputSink)>;

static BOOT_INSTANT: OnceLock<Instant> = OnceLock::new();

fn uptime_millis() -> u64 {
    BOOT_INSTANT
        .get()
        .map(|boot| boot.elapsed().as_millis() as u64)
        .unwrap_or(0)
}

fn uptime_secs() -> u32 {
    (uptime_millis() / 1000) as u32
}

/// Card sink that serializes each event onto the output channel.
struct OutputSink(SyncSender<MsgBuffer>);

impl CardSink for OutputSink {
    fn card_observed(&mut self, event: CardObserved) {
        match comm::card_message(&event) {
            Some(buf) => {
                if self.0.send(buf).is_err() {
                    log::warn!("Output closed, dropping {}", event.card);
                }
            }
            None => log::warn!("Card message did not fit the output buffer"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    BOOT_INSTANT.get_or_init(Instant::now);

    let config = SimConfig::from_env().context("invalid simulator configuration")?;
    log::info!("CardBeacon simulator v{} starting", VERSION);
    log::debug!("{:?}", config);

    let (event_tx, event_rx) = mpsc::sync_channel::<Event>(16);
    let (output_tx, output_rx) = mpsc::sync_channel::<MsgBuffer>(16);

    let air = Arc::new(Mutex::new(Air::new()));
    if config.noise {
        radio::add_noise(&air);
    }

    // ── Radio ────────────────────────────────────────────────────────

    let notify_tx = event_tx.clone();
    let sim_radio = SimRadio::spawn(
        air.clone(),
        Duration::from_millis(config.scan_latency_ms),
        move || {
            let _ = notify_tx.try_send(Event::ResultsAvailable);
        },
    )
    .context("spawning radio thread")?;

    // ── Sender ───────────────────────────────────────────────────────

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let cards = config.cards;
    thread::Builder::new()
        .name("sender".into())
        .spawn(move || radio::broadcaster_thread(air, rng, cards))
        .context("spawning sender thread")?;

    // ── Pipeline ─────────────────────────────────────────────────────

    let pipeline = ScanPipeline::new(
        sim_radio,
        (CardHistory::new(), OutputSink(output_tx.clone())),
        config.pipeline,
    );
    let pipeline_handle = thread::Builder::new()
        .name("pipeline".into())
        .spawn(move || pipeline_thread(pipeline, event_rx, output_tx))
        .context("spawning pipeline thread")?;

    // ── Output ───────────────────────────────────────────────────────

    let output_handle = thread::Builder::new()
        .name("output".into())
        .spawn(move || output_thread(output_rx))
        .context("spawning output thread")?;

    // ── Commands from stdin ──────────────────────────────────────────

    let stdin_tx = event_tx.clone();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || stdin_thread(io::stdin().lock(), stdin_tx))
        .context("spawning stdin thread")?;

    if config.run_secs > 0 {
        thread::sleep(Duration::from_secs(config.run_secs));
        log::info!("Run time elapsed, shutting down");
        let _ = event_tx.send(Event::Shutdown);
    }

    pipeline_handle
        .join()
        .map_err(|_| anyhow::anyhow!("pipeline thread panicked"))?;
    output_handle
        .join()
        .map_err(|_| anyhow::anyhow!("output thread panicked"))?
        .context("writing to stdout")?;
    Ok(())
}

/// Sole owner of the scan pipeline. Starts scanning right away, then
/// sleeps until the next event or timer deadline.
fn pipeline_thread(mut pipeline: Pipeline, events: Receiver<Event>, output_tx: SyncSender<MsgBuffer>) {
    if let Err(e) = pipeline.start(uptime_millis()) {
        log::error!("Scanning could not start: {}", e);
    }

    loop {
        let event = match pipeline.next_deadline() {
            Some(at) => {
                let wait = Duration::from_millis(at.saturating_sub(uptime_millis()));
                match events.recv_timeout(wait) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match events.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        let now = uptime_millis();
        match event {
            Some(Event::ResultsAvailable) => {
                pipeline.on_results_available(now);
            }
            Some(Event::Command(cmd)) => {
                let reply = comm::handle_command(cmd, &mut pipeline, now);
                send_reply(reply, &pipeline, &output_tx);
            }
            Some(Event::Shutdown) => {
                if let Err(e) = pipeline.stop() {
                    log::warn!("Stop reported: {}", e);
                }
                send_reply(Reply::History, &pipeline, &output_tx);
                send_reply(Reply::Status, &pipeline, &output_tx);
                break;
            }
            None => {}
        }
        pipeline.poll(uptime_millis());
    }
}

fn send_reply(reply: Reply, pipeline: &Pipeline, output_tx: &SyncSender<MsgBuffer>) {
    let msg = match reply {
        Reply::None => return,
        Reply::Status => comm::status_message(pipeline, uptime_secs()),
        Reply::History => comm::history_message(pipeline.sink().0.iter()),
    };
    if let Some(buf) = msg {
        let _ = output_tx.send(buf);
    }
}

/// Print NDJSON messages until every sender is gone.
fn output_thread(output_rx: Receiver<MsgBuffer>) -> io::Result<()> {
    let stdout = io::stdout();
    while let Ok(msg) = output_rx.recv() {
        let mut out = stdout.lock();
        out.write_all(&msg)?;
        out.flush()?;
    }
    Ok(())
}

/// Assemble NDJSON command lines from `input` and forward parsed commands.
fn stdin_thread(input: impl BufRead, event_tx: SyncSender<Event>) {
    let mut reader = LineReader::new();
    for byte in input.bytes() {
        let Ok(byte) = byte else {
            break;
        };
        if let Some(line) = reader.feed(byte) {
            match comm::parse_command(line) {
                Some(cmd) => {
                    if event_tx.send(Event::Command(cmd)).is_err() {
                        return;
                    }
                }
                None => log::warn!("Ignoring unrecognized command: {}", String::from_utf8_lossy(line)),
            }
        }
    }
    log::debug!("stdin closed");
}
