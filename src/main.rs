#![no_std]
#![no_main]

use core::convert::Infallible;
use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::{system::software_reset, timer::timg::TimerGroup};
use log::{error, info, warn};
use mqtt_session::BrokerConfig;
use network::connect_to_wifi;
use sensor_node::{
    config::{
        LOOP_TICK_MILLISECONDS, MQTT_RECONNECT_DELAY_MILLISECONDS,
        PUBLISH_INTERVAL_MILLISECONDS, STARTUP_SETTLE_MILLISECONDS,
    },
    identity::DeviceIdentity,
    node::{probe_barometer, SensorNode},
    wifi::WifiCredentials,
};
use sensors::OnboardThermometer;

mod mqtt_session;
mod network;
mod sensors;

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PSK: &str = or_empty(option_env!("WIFI_PSK"));
const WIFI_EAP_USERNAME: &str = or_empty(option_env!("WIFI_EAP_USERNAME"));
const WIFI_EAP_PASSWORD: &str = or_empty(option_env!("WIFI_EAP_PASSWORD"));

const BROKER: BrokerConfig = BrokerConfig {
    hostname: env!("MQTT_HOSTNAME"),
    port: env!("MQTT_PORT"),
    client_id: env!("MQTT_CLIENT_ID"),
    username: or_empty(option_env!("MQTT_USERNAME")),
    password: or_empty(option_env!("MQTT_PASSWORD")),
    topic_prefix: or_empty(option_env!("MQTT_TOPIC_PREFIX")),
};

const fn or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(value) => value,
        None => "",
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    match main_fallible(spawner).await {
        Ok(never) => match never {},
        Err(error) => {
            error!("Error while running firmware: {}", error);
            software_reset()
        }
    }
}

async fn main_fallible(spawner: Spawner) -> Result<Infallible, Error> {
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    Timer::after(Duration::from_millis(STARTUP_SETTLE_MILLISECONDS)).await;
    info!("Starting ESP32 sensor node...");

    let barometer = probe_barometer(sensors::barometer(
        peripherals.I2C0,
        peripherals.GPIO8,
        peripherals.GPIO9,
    ));
    let chip = match OnboardThermometer::new(peripherals.TSENS) {
        Ok(chip) => Some(chip),
        Err(e) => {
            error!("Onboard temperature sensor unavailable: {:?}", e);
            None
        }
    };

    let credentials =
        WifiCredentials::select(WIFI_SSID, WIFI_PSK, WIFI_EAP_USERNAME, WIFI_EAP_PASSWORD);
    let network = connect_to_wifi(peripherals.WIFI, credentials, spawner).await?;

    let identity = DeviceIdentity::from_mac(network.mac).unwrap_or_else(|e| {
        error!("Failed to read MAC address: {}", e);
        DeviceIdentity::unset()
    });

    let mut node = SensorNode::new(identity, barometer, chip, PUBLISH_INTERVAL_MILLISECONDS);
    info!("Device MAC address: {}", node.identity());
    if node.is_sensor_attached() {
        info!("Publishing BMP085 pressure and temperature");
    } else {
        info!("Publishing onboard temperature");
    }

    let resources = mqtt_session::resources();

    loop {
        let mut session =
            match mqtt_session::connect(network.stack, &mut *resources, &BROKER).await {
                Ok(session) => session,
                Err(e) => {
                    error!("Error initializing MQTT client: {}", e);
                    Timer::after(Duration::from_millis(MQTT_RECONNECT_DELAY_MILLISECONDS)).await;
                    continue;
                }
            };

        while session.is_healthy() {
            node.poll(Instant::now().as_millis(), &mut session).await;
            Timer::after(Duration::from_millis(LOOP_TICK_MILLISECONDS)).await;
        }

        warn!("MQTT session lost, reconnecting");
    }
}

#[derive(Debug)]
enum Error {
    Network(network::Error),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Network(e) => write!(f, "{}", e),
        }
    }
}

impl From<network::Error> for Error {
    fn from(error: network::Error) -> Self {
        Self::Network(error)
    }
}
