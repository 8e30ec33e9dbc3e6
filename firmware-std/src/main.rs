//! CardBeacon receiver — ESP-IDF std firmware
//!
//! Thread-based implementation using FreeRTOS threads and std::sync::mpsc
//! channels. Feature-equivalent to the no_std Embassy firmware, but scans
//! with the ESP-IDF station scan API instead of a promiscuous sniffer:
//! `esp_wifi_scan_start` is the trigger, the `ScanDone` system event is the
//! "results available" notification, and the AP records are the results.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use cardbeacon::comm::{self, LineReader, Reply};
use cardbeacon::defaults::MAX_SCAN_RESULTS;
use cardbeacon::history::CardHistory;
use cardbeacon::pipeline::{
    CardObserved, CardSink, FacilityError, PipelineConfig, ScanFacility, ScanPipeline, ScanResults,
};
use cardbeacon::protocol::{HostCommand, MsgBuffer, VERSION};
use cardbeacon::{board, codec};

use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{
    esp, esp_err_t, esp_wifi_scan_get_ap_records, esp_wifi_scan_start, wifi_ap_record_t, EspError,
    ESP_ERR_WIFI_STATE,
};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi, WifiEvent};

use esp32_nimble::utilities::BleUuid;
use esp32_nimble::{BLEAdvertisementData, BLEDevice, NimbleProperties};

/// Input to the pipeline thread
enum Event {
    ResultsAvailable,
    Command(HostCommand),
}

type Pipeline = ScanPipeline<IdfScanFacility, (CardHistory, OutputSink)>;

/// Boot time — captured once in main, used for timestamps and uptime.
static BOOT_INSTANT: OnceLock<Instant> = OnceLock::new();

/// Number of connected BLE clients
static BLE_CLIENTS: AtomicU8 = AtomicU8::new(0);

fn uptime_millis() -> u64 {
    BOOT_INSTANT
        .get()
        .map(|boot| boot.elapsed().as_millis() as u64)
        .unwrap_or(0)
}

fn uptime_secs() -> u32 {
    (uptime_millis() / 1000) as u32
}

// ── Scan facility over the ESP-IDF scan API ──────────────────────────

struct IdfScanFacility {
    sys_loop: EspSystemEventLoop,
    events: SyncSender<Event>,
    subscription: Option<EspSubscription<'static, System>>,
}

fn facility_error(e: EspError) -> FacilityError {
    if e.code() == ESP_ERR_WIFI_STATE as esp_err_t {
        // Driver is already scanning (or connecting)
        FacilityError::Busy
    } else {
        log::warn!("WiFi scan error: {}", e);
        FacilityError::Unavailable
    }
}

impl ScanFacility for IdfScanFacility {
    fn subscribe(&mut self) -> Result<(), FacilityError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let events = self.events.clone();
        let subscription = self
            .sys_loop
            .subscribe::<WifiEvent, _>(move |event| {
                if matches!(event, WifiEvent::ScanDone { .. }) {
                    let _ = events.try_send(Event::ResultsAvailable);
                }
            })
            .map_err(|e| {
                log::warn!("Event loop subscribe failed: {}", e);
                FacilityError::Unavailable
            })?;
        self.subscription = Some(subscription);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), FacilityError> {
        // Dropping the subscription unregisters the handler
        self.subscription
            .take()
            .map(drop)
            .ok_or(FacilityError::NotSubscribed)
    }

    fn trigger_scan(&mut self) -> Result<(), FacilityError> {
        // Null config: active scan over all channels, non-blocking
        esp!(unsafe { esp_wifi_scan_start(std::ptr::null(), false) }).map_err(facility_error)
    }

    fn current_results(&self) -> ScanResults {
        // Safety: plain C struct, all-zero is a valid value
        let mut records: [wifi_ap_record_t; MAX_SCAN_RESULTS] = unsafe { std::mem::zeroed() };
        let mut count = MAX_SCAN_RESULTS as u16;
        if let Err(e) = esp!(unsafe { esp_wifi_scan_get_ap_records(&mut count, records.as_mut_ptr()) }) {
            log::warn!("Reading scan results failed: {}", e);
            return ScanResults::new();
        }

        let mut results = ScanResults::new();
        for record in &records[..usize::from(count).min(MAX_SCAN_RESULTS)] {
            // SSID is a NUL-terminated byte array
            let len = record.ssid.iter().position(|&b| b == 0).unwrap_or(record.ssid.len());
            let Ok(ssid) = std::str::from_utf8(&record.ssid[..len]) else {
                continue;
            };
            if let Ok(name) = codec::BeaconName::try_from(ssid) {
                let _ = results.push(name);
            }
        }
        results
    }
}

/// Card sink that serializes each event onto the output channel.
struct OutputSink(SyncSender<MsgBuffer>);

impl CardSink for OutputSink {
    fn card_observed(&mut self, event: CardObserved) {
        let Some(buf) = comm::card_message(&event) else {
            log::warn!("Card message did not fit the output buffer");
            return;
        };
        if self.0.try_send(buf).is_err() {
            log::warn!("Output channel full, dropping {}", event.card);
        }
    }
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    BOOT_INSTANT.get_or_init(Instant::now);

    log::info!("CardBeacon receiver v{} starting on {} (std)", VERSION, board::BOARD_NAME);

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── Channels ─────────────────────────────────────────────────────

    let (event_tx, event_rx) = mpsc::sync_channel::<Event>(8);
    let (output_tx, output_rx) = mpsc::sync_channel::<MsgBuffer>(8);
    let (ble_output_tx, ble_output_rx) = mpsc::sync_channel::<MsgBuffer>(4);

    // ── WiFi in station mode, unconnected, for scanning ──────────────

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop.clone(),
    )?;
    wifi.set_configuration(&esp_idf_svc::wifi::Configuration::Client(Default::default()))?;
    wifi.start()?;
    log::info!("WiFi started in station mode");

    // ── Pipeline thread ──────────────────────────────────────────────

    let facility = IdfScanFacility {
        sys_loop,
        events: event_tx.clone(),
        subscription: None,
    };
    let pipeline = ScanPipeline::new(
        facility,
        (CardHistory::new(), OutputSink(output_tx.clone())),
        PipelineConfig::new(),
    );
    let pipeline_output_tx = output_tx.clone();
    thread::Builder::new()
        .name("pipeline".into())
        .stack_size(8192)
        .spawn(move || {
            pipeline_thread(pipeline, event_rx, pipeline_output_tx);
        })?;
    log::info!("Pipeline thread spawned");

    // ── Output thread ────────────────────────────────────────────────

    thread::Builder::new()
        .name("output".into())
        .stack_size(4096)
        .spawn(move || {
            output_thread(output_rx, ble_output_tx);
        })?;
    log::info!("Output thread spawned");

    // ── Status thread ────────────────────────────────────────────────

    let status_event_tx = event_tx.clone();
    thread::Builder::new()
        .name("status".into())
        .stack_size(2048)
        .spawn(move || {
            status_thread(status_event_tx);
        })?;
    log::info!("Status thread spawned");

    // ── BLE (NimBLE) — runs on main thread, keeps `wifi` alive ───────

    ble_main(event_tx, ble_output_rx)?;
    drop(wifi);
    Ok(())
}

// ── Pipeline thread ──────────────────────────────────────────────────

/// Sole owner of the scan pipeline. Starts scanning at boot, then sleeps
/// until the next event or timer deadline.
fn pipeline_thread(mut pipeline: Pipeline, events: Receiver<Event>, output_tx: SyncSender<MsgBuffer>) {
    if let Err(e) = pipeline.start(uptime_millis()) {
        log::error!("Scanning could not start at boot: {}", e);
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
            None => {}
        }
        pipeline.poll(uptime_millis());
    }

    log::warn!("Pipeline event channel closed");
}

fn send_reply(reply: Reply, pipeline: &Pipeline, output_tx: &SyncSender<MsgBuffer>) {
    let msg = match reply {
        Reply::None => return,
        Reply::Status => comm::status_message(pipeline, uptime_secs()),
        Reply::History => comm::history_message(pipeline.sink().0.iter()),
    };
    if let Some(buf) = msg {
        let _ = output_tx.try_send(buf);
    }
}

// ── Output thread ────────────────────────────────────────────────────

fn output_thread(output_rx: Receiver<MsgBuffer>, ble_output_tx: SyncSender<MsgBuffer>) {
    log::info!("Output thread started");

    while let Ok(msg) = output_rx.recv() {
        let _ = ble_output_tx.try_send(msg.clone());

        if let Ok(s) = std::str::from_utf8(&msg) {
            log::info!("{}", s.trim_end());
        }
    }
}

// ── Status thread ────────────────────────────────────────────────────

fn status_thread(event_tx: SyncSender<Event>) {
    loop {
        thread::sleep(Duration::from_secs(30));
        if event_tx.send(Event::Command(HostCommand::GetStatus)).is_err() {
            return;
        }
    }
}

// ── BLE (NimBLE) main loop ───────────────────────────────────────────

fn ble_main(event_tx: SyncSender<Event>, ble_output_rx: Receiver<MsgBuffer>) -> anyhow::Result<()> {
    let ble_device = BLEDevice::take();
    let server = ble_device.get_server();

    // NimBLE auto-restarts advertising on disconnect
    server.on_connect(|_server, desc| {
        log::info!("BLE client connected: {}", desc.address());
        BLE_CLIENTS.fetch_add(1, Ordering::Relaxed);
    });
    server.on_disconnect(|desc, _reason| {
        log::info!("BLE client disconnected: {}", desc.address());
        BLE_CLIENTS.fetch_sub(1, Ordering::Relaxed);
    });

    // Same UUIDs as the no_std firmware
    let uuid = |s: &str| {
        BleUuid::from_uuid128_string(s).map_err(|e| anyhow::anyhow!("invalid UUID {}: {:?}", s, e))
    };
    let service_uuid = uuid(comm::ble_uuids::SERVICE)?;
    let tx_uuid = uuid(comm::ble_uuids::TX_CHAR)?;
    let rx_uuid = uuid(comm::ble_uuids::RX_CHAR)?;

    let service = server.create_service(service_uuid);
    let tx_char = service.lock().create_characteristic(tx_uuid, NimbleProperties::NOTIFY);
    let rx_char = service.lock().create_characteristic(rx_uuid, NimbleProperties::WRITE);

    // RX write handler — parse incoming NDJSON commands
    rx_char.lock().on_write(move |args| {
        thread_local! {
            static LINE_READER: std::cell::RefCell<LineReader> =
                const { std::cell::RefCell::new(LineReader::new()) };
        }
        LINE_READER.with(|lr| {
            let mut lr = lr.borrow_mut();
            for &byte in args.recv_data() {
                if let Some(cmd) = lr.feed(byte).and_then(comm::parse_command) {
                    if event_tx.try_send(Event::Command(cmd)).is_err() {
                        log::warn!("Pipeline busy, dropping command");
                    }
                }
            }
        });
    });

    let mut adv_data = BLEAdvertisementData::new();
    adv_data.name(comm::BLE_ADV_NAME).add_service_uuid(service_uuid);
    ble_device
        .get_advertising()
        .lock()
        .set_data(&mut adv_data)
        .map_err(|e| anyhow::anyhow!("BLE advertising data failed: {:?}", e))?;
    ble_device
        .get_advertising()
        .lock()
        .start()
        .map_err(|e| anyhow::anyhow!("BLE advertising start failed: {:?}", e))?;
    log::info!("BLE advertising as '{}'", comm::BLE_ADV_NAME);

    // TX notify loop — chunk each NDJSON message into notifications
    while let Ok(msg) = ble_output_rx.recv() {
        if BLE_CLIENTS.load(Ordering::Relaxed) == 0 {
            continue;
        }
        for chunk in msg.chunks(comm::BLE_MAX_NOTIFY) {
            let mut padded = [b'\n'; comm::BLE_MAX_NOTIFY];
            padded[..chunk.len()].copy_from_slice(chunk);
            tx_char.lock().set_value(&padded).notify();
        }
    }

    anyhow::bail!("BLE output channel disconnected")
}
