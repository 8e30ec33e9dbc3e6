//! CardBeacon receiver — ESP32 firmware
//!
//! Sniffs WiFi beacons in promiscuous mode, decodes covert card beacons
//! through the scan pipeline, and emits each newly seen card as NDJSON
//! over BLE GATT notifications and serial.
//!
//! Tasks:
//! - channel hop: runs one sweep over the scan channels per trigger
//! - pipeline: owns the `ScanPipeline`, reacts to results, commands, timers
//! - output: logs messages to serial and forwards them to BLE
//! - status: periodic status report
//! - BLE: GATT server for the companion app

#![no_std]
#![no_main]

extern crate alloc;

use esp_backtrace as _;

esp_bootloader_esp_idf::esp_app_desc!();

use core::cell::RefCell;
use critical_section::Mutex;
use embassy_futures::select::{select, select3, Either, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use static_cell::StaticCell;

use trouble_host::prelude::*;

use cardbeacon::comm::{self, LineReader, Reply};
use cardbeacon::history::CardHistory;
use cardbeacon::pipeline::{
    CardObserved, CardSink, FacilityError, PipelineConfig, ScanFacility, ScanPipeline, ScanResults,
};
use cardbeacon::protocol::{HostCommand, MsgBuffer, VERSION};
use cardbeacon::scanner::{self, SweepScanner};
use cardbeacon::board;

// ── BLE GATT server definition ──────────────────────────────────────
//
// Proc macros depend on trouble-host which is firmware-only. The UUID
// constants in comm::ble_uuids are the canonical source; proc macros
// require string literals.

#[gatt_service(uuid = "c4a20001-5d7e-4b8f-9a3c-2e61f0b8d417")]
struct CardGattService {
    /// TX — card events, notify-only.
    /// Messages are chunked into BLE_MAX_NOTIFY-sized pieces.
    /// The companion accumulates until it sees '\n' (NDJSON delimiter).
    #[characteristic(uuid = "c4a20002-5d7e-4b8f-9a3c-2e61f0b8d417", notify)]
    tx: [u8; 20],

    /// RX — host commands, write-only.
    /// Companion sends NDJSON commands which are accumulated via LineReader.
    #[characteristic(uuid = "c4a20003-5d7e-4b8f-9a3c-2e61f0b8d417", write)]
    rx: [u8; 20],
}

#[gatt_server]
struct CardServer {
    card_service: CardGattService,
}

// ── Channel type aliases ──────────────────────────────────────────────

type OutputChannel = Channel<CriticalSectionRawMutex, MsgBuffer, 8>;
type BleOutputChannel = Channel<CriticalSectionRawMutex, MsgBuffer, 4>;
type CommandChannel = Channel<CriticalSectionRawMutex, HostCommand, 4>;

type Pipeline = ScanPipeline<SharedSweep, (CardHistory, OutputSink)>;

// ── Static channels and shared state ─────────────────────────────────

/// Sniffer state shared by the ISR callback, the hop task and the
/// pipeline. Critical-section Mutex because the callback runs in ISR
/// context.
static SNIFFER: Mutex<RefCell<SweepScanner>> = Mutex::new(RefCell::new(SweepScanner::new()));

/// Raised by the hop task when a sweep completes for a subscriber
static RESULTS_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Raised when a scan trigger opens a new sweep
static SWEEP_REQUESTED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Serialized messages for serial + BLE
static OUTPUT_CHANNEL: OutputChannel = Channel::new();

/// BLE output — the serial task clones messages here for the GATT server
static BLE_OUTPUT_CHANNEL: BleOutputChannel = Channel::new();

/// Host commands from BLE, plus the periodic status request
static CMD_CHANNEL: CommandChannel = Channel::new();

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

fn uptime_secs() -> u32 {
    (Instant::now().as_millis() / 1000) as u32
}

// ── Scan facility over the shared sniffer ────────────────────────────

/// Handle the pipeline uses to reach the shared [`SweepScanner`].
struct SharedSweep;

impl SharedSweep {
    fn with<R>(f: impl FnOnce(&mut SweepScanner) -> R) -> R {
        critical_section::with(|cs| f(&mut SNIFFER.borrow_ref_mut(cs)))
    }
}

impl ScanFacility for SharedSweep {
    fn subscribe(&mut self) -> Result<(), FacilityError> {
        Self::with(|s| s.subscribe())
    }

    fn unsubscribe(&mut self) -> Result<(), FacilityError> {
        Self::with(|s| s.unsubscribe())
    }

    fn trigger_scan(&mut self) -> Result<(), FacilityError> {
        Self::with(|s| s.trigger_scan())?;
        SWEEP_REQUESTED.signal(());
        Ok(())
    }

    fn current_results(&self) -> ScanResults {
        Self::with(|s| s.current_results())
    }
}

/// Card sink that serializes each event onto the output channel.
struct OutputSink;

impl CardSink for OutputSink {
    fn card_observed(&mut self, event: CardObserved) {
        let Some(buf) = comm::card_message(&event) else {
            log::warn!("Card message did not fit the output buffer");
            return;
        };
        if OUTPUT_CHANNEL.try_send(buf).is_err() {
            log::warn!("Output channel full, dropping {}", event.card);
        }
    }
}

// ── WiFi sniffer ──────────────────────────────────────────────────────

/// WiFi sniffer callback — called from ISR context by the esp-radio sniffer.
///
/// Reduces beacons and probe responses to their SSID and records it in the
/// open sweep, if any.
fn wifi_sniffer_callback(pkt: esp_radio::wifi::sniffer::PromiscuousPkt<'_>) {
    if let Some(ssid) = scanner::parse_beacon_ssid(pkt.data) {
        critical_section::with(|cs| SNIFFER.borrow_ref_mut(cs).record(&ssid));
    }
}

// FFI binding for WiFi channel control.
// The symbol is linked via esp-radio's WiFi driver.
unsafe extern "C" {
    fn esp_wifi_set_channel(primary: u8, second: u32) -> i32;
}

/// Channel hop task — one sweep over the scan channels per trigger, then
/// publishes the sweep and notifies the pipeline.
#[embassy_executor::task]
async fn wifi_channel_hop_task() {
    loop {
        SWEEP_REQUESTED.wait().await;

        for &ch in scanner::WIFI_CHANNELS {
            let rc = unsafe { esp_wifi_set_channel(ch, 0) };
            if rc != 0 {
                log::warn!("Setting WiFi channel {} failed ({})", ch, rc);
            }
            Timer::after(Duration::from_millis(scanner::DEFAULT_DWELL_MS)).await;
        }

        if critical_section::with(|cs| SNIFFER.borrow_ref_mut(cs).complete_sweep()) {
            RESULTS_READY.signal(());
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────

#[esp_rtos::main]
async fn main(spawner: embassy_executor::Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Set up heap allocator (needed for BLE + WiFi coex stacks).
    // ESP32-S3 needs more heap for coex; ESP32 is tighter on DRAM.
    #[cfg(feature = "esp32")]
    {
        esp_alloc::heap_allocator!(size: 64 * 1024);
    }
    #[cfg(not(feature = "esp32"))]
    {
        esp_alloc::heap_allocator!(size: 128 * 1024);
    }

    // Start the RTOS — requires timer + software interrupt
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log::info!(
        "CardBeacon receiver v{} starting on {} (psram: {})",
        VERSION,
        board::BOARD_NAME,
        board::HAS_PSRAM
    );

    // ── BLE radio initialization ───────────────────────────────────────
    // BLE must be initialized BEFORE WiFi for coexistence to work
    // (especially on ESP32-S3).

    let connector =
        esp_radio::ble::controller::BleConnector::new(peripherals.BT, Default::default())
            .expect("BLE connector init failed");

    log::info!("BLE connector initialized");

    // ── WiFi sniffer initialization ─────────────────────────────────────

    let (_wifi_controller, wifi_interfaces) =
        esp_radio::wifi::new(peripherals.WIFI, Default::default()).expect("WiFi init failed");

    let mut sniffer = wifi_interfaces.sniffer;
    sniffer.set_receive_cb(wifi_sniffer_callback);
    match sniffer.set_promiscuous_mode(true) {
        Ok(()) => {
            critical_section::with(|cs| SNIFFER.borrow_ref_mut(cs).set_radio_ready(true));
            log::info!("WiFi sniffer initialized in promiscuous mode");
        }
        // The pipeline reports the facility as unavailable from here on
        Err(e) => log::error!("Promiscuous mode failed: {:?}", e),
    }

    let pipeline = ScanPipeline::new(
        SharedSweep,
        (CardHistory::new(), OutputSink),
        PipelineConfig::new(),
    );

    spawner.spawn(wifi_channel_hop_task()).unwrap();
    spawner.spawn(pipeline_task(pipeline)).unwrap();
    spawner.spawn(output_serial_task()).unwrap();
    spawner.spawn(status_task()).unwrap();

    let controller: ExternalController<_, 20> = ExternalController::new(connector);

    static HOST_RESOURCES: StaticCell<HostResources<DefaultPacketPool, 1, 2>> = StaticCell::new();
    let resources = HOST_RESOURCES.init(HostResources::new());

    let address = Address::random([0xff, 0x8f, 0x1a, 0x05, 0xe4, 0xc7]);

    let stack = trouble_host::new(controller, resources).set_random_address(address);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let server = CardServer::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: comm::BLE_ADV_NAME,
        appearance: &appearance::UNKNOWN,
    }))
    .expect("GATT server init failed");

    log::info!("BLE radio initialized");

    // ── BLE orchestration ──────────────────────────────────────────────
    //
    // Two concurrent futures via join:
    //   1. BLE stack runner (drives HCI)
    //   2. GATT server (advertise, accept connections, send notifications)

    let _ = embassy_futures::join::join(
        async {
            loop {
                if let Err(e) = runner.run().await {
                    log::error!("BLE runner error: {:?}", e);
                    Timer::after(Duration::from_secs(1)).await;
                }
            }
        },
        async {
            loop {
                let mut adv_data = [0u8; 31];
                let adv_len = match AdStructure::encode_slice(
                    &[
                        AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
                        AdStructure::CompleteLocalName(comm::BLE_ADV_NAME.as_bytes()),
                    ],
                    &mut adv_data[..],
                ) {
                    Ok(len) => len,
                    Err(e) => {
                        log::error!("Ad encode error: {:?}", e);
                        Timer::after(Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let advertiser = match peripheral
                    .advertise(
                        &Default::default(),
                        Advertisement::ConnectableScannableUndirected {
                            adv_data: &adv_data[..adv_len],
                            scan_data: &[],
                        },
                    )
                    .await
                {
                    Ok(adv) => adv,
                    Err(e) => {
                        log::error!("BLE advertise error: {:?}", e);
                        Timer::after(Duration::from_secs(5)).await;
                        continue;
                    }
                };

                log::info!("BLE advertising as '{}'", comm::BLE_ADV_NAME);

                let conn = match advertiser.accept().await {
                    Ok(c) => c,
                    Err(e) => {
                        log::error!("BLE accept error: {:?}", e);
                        continue;
                    }
                };

                let gatt_conn = match conn.with_attribute_server(&server) {
                    Ok(gc) => gc,
                    Err(e) => {
                        log::error!("GATT setup error: {:?}", e);
                        continue;
                    }
                };

                log::info!("BLE client connected");
                handle_gatt_connection(&gatt_conn, &server).await;
                log::info!("BLE client disconnected, re-advertising");
            }
        },
    )
    .await;
}

/// Handle a GATT connection: forward output messages as notifications
/// and process incoming writes as host commands.
async fn handle_gatt_connection<'s, P: PacketPool>(
    conn: &GattConnection<'_, 's, P>,
    server: &'s CardServer<'_>,
) {
    let ble_rx = BLE_OUTPUT_CHANNEL.receiver();
    let mut line_reader = LineReader::new();

    loop {
        match select(ble_rx.receive(), conn.next()).await {
            Either::First(msg) => {
                // Pad the last chunk with newlines so the companion's NDJSON
                // parser sees empty lines instead of null bytes.
                for chunk in msg.chunks(comm::BLE_MAX_NOTIFY) {
                    let mut padded = [b'\n'; comm::BLE_MAX_NOTIFY];
                    padded[..chunk.len()].copy_from_slice(chunk);
                    if server.card_service.tx.notify(conn, &padded).await.is_err() {
                        return;
                    }
                }
            }
            Either::Second(GattConnectionEvent::Disconnected { .. }) => return,
            Either::Second(GattConnectionEvent::Gatt { event }) => {
                if let GattEvent::Write(ref write_event) = event {
                    if write_event.handle() == server.card_service.rx.handle {
                        for &byte in write_event.data() {
                            if let Some(cmd) = line_reader.feed(byte).and_then(comm::parse_command) {
                                if CMD_CHANNEL.try_send(cmd).is_err() {
                                    log::warn!("Command channel full, dropping command");
                                }
                            }
                        }
                    }
                }
                // Must accept/reply to all GATT events
                if let Ok(reply) = event.accept() {
                    reply.send().await;
                }
            }
            Either::Second(_) => {}
        }
    }
}

/// Pipeline task — sole owner of the scan pipeline. Starts scanning at
/// boot, then reacts to sweep results, host commands and timer deadlines.
#[embassy_executor::task]
async fn pipeline_task(mut pipeline: Pipeline) {
    if let Err(e) = pipeline.start(now_ms()) {
        log::error!("Scanning could not start at boot: {}", e);
    }

    let cmd_rx = CMD_CHANNEL.receiver();

    loop {
        let deadline = pipeline.next_deadline();
        let timer = async {
            match deadline {
                Some(at) => Timer::at(Instant::from_millis(at)).await,
                None => core::future::pending::<()>().await,
            }
        };

        match select3(RESULTS_READY.wait(), cmd_rx.receive(), timer).await {
            Either3::First(()) => {
                pipeline.on_results_available(now_ms());
            }
            Either3::Second(cmd) => {
                let reply = comm::handle_command(cmd, &mut pipeline, now_ms());
                send_reply(reply, &pipeline);
            }
            Either3::Third(()) => {}
        }
        // Busy result/command traffic must not starve the timers
        pipeline.poll(now_ms());
    }
}

fn send_reply(reply: Reply, pipeline: &Pipeline) {
    let msg = match reply {
        Reply::None => return,
        Reply::Status => comm::status_message(pipeline, uptime_secs()),
        Reply::History => comm::history_message(pipeline.sink().0.iter()),
    };
    if let Some(buf) = msg {
        let _ = OUTPUT_CHANNEL.try_send(buf);
    }
}

/// Serial output task — reads from output channel, logs to serial,
/// and forwards a clone to the BLE output channel.
#[embassy_executor::task]
async fn output_serial_task() {
    let output_rx = OUTPUT_CHANNEL.receiver();

    loop {
        let msg = output_rx.receive().await;

        // Non-blocking: drops if full or no client
        let _ = BLE_OUTPUT_CHANNEL.try_send(msg.clone());

        if let Ok(s) = core::str::from_utf8(&msg) {
            log::info!("{}", s.trim_end());
        }
    }
}

/// Periodic status reporting task. Goes through the command channel so
/// the pipeline task builds the report from live state.
#[embassy_executor::task]
async fn status_task() {
    loop {
        Timer::after(Duration::from_secs(30)).await;
        let _ = CMD_CHANNEL.try_send(HostCommand::GetStatus);
    }
}
