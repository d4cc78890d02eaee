use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::{peripherals, rng::Rng};
use esp_radio::{
    wifi::{
        ClientConfig, EapClientConfig, ModeConfig, WifiController, WifiDevice, WifiError,
        WifiEvent,
    },
    Controller, InitializationError,
};
use log::{error, info};
use sensor_node::{config::WIFI_RECONNECT_DELAY_MILLISECONDS, wifi::WifiCredentials};
use static_cell::StaticCell;

/// Static cell for network stack resources
static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

static RADIO: StaticCell<Controller<'static>> = StaticCell::new();

/// A joined network
pub struct Network {
    pub stack: Stack<'static>,
    /// Station interface hardware address
    pub mac: [u8; 6],
}

pub async fn connect_to_wifi(
    wifi: peripherals::WIFI<'static>,
    credentials: WifiCredentials<'static>,
    spawner: Spawner,
) -> Result<Network, Error> {
    let radio = RADIO.init(esp_radio::init()?);
    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi, Default::default())?;

    let mac = interfaces.sta.mac_address();

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let config = embassy_net::Config::dhcpv4(Default::default());

    info!("Initialize network stack");
    let stack_resources: &'static mut _ = STACK_RESOURCES.init(StackResources::new());
    let (stack, runner) = embassy_net::new(interfaces.sta, config, stack_resources, seed);

    if credentials.is_enterprise() {
        info!("Using WPA2-Enterprise for SSID {}", credentials.ssid());
    } else {
        info!("Using WPA2-Personal for SSID {}", credentials.ssid());
    }

    spawner.spawn(connection(controller, mode_config(&credentials))).ok();
    spawner.spawn(net_task(runner)).ok();

    info!("Wait for network link");
    loop {
        if stack.is_link_up() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }

    info!("Wait for IP address");
    loop {
        if let Some(config) = stack.config_v4() {
            info!("Connected to WiFi with IP address {}", config.address);
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }

    Ok(Network { stack, mac })
}

fn mode_config(credentials: &WifiCredentials<'_>) -> ModeConfig {
    match *credentials {
        WifiCredentials::Personal { ssid, password } => ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(ssid.into())
                .with_password(password.into()),
        ),
        WifiCredentials::Enterprise {
            ssid,
            username,
            password,
        } => ModeConfig::EapClient(
            EapClientConfig::default()
                .with_ssid(ssid.into())
                .with_identity(Some(username.into()))
                .with_username(Some(username.into()))
                .with_password(Some(password.into())),
        ),
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Task for WiFi connection
///
/// This will wrap [`connection_fallible()`] and trap any error.
#[embassy_executor::task]
async fn connection(controller: WifiController<'static>, config: ModeConfig) {
    if let Err(error) = connection_fallible(controller, config).await {
        error!("Cannot connect to WiFi: {:?}", error);
    }
}

/// Keeps the station associated, rejoining after every disconnect.
async fn connection_fallible(
    mut controller: WifiController<'static>,
    config: ModeConfig,
) -> Result<(), WifiError> {
    info!("Start connection task");

    loop {
        if controller.is_connected()? {
            // wait until we're no longer connected
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            Timer::after(Duration::from_millis(WIFI_RECONNECT_DELAY_MILLISECONDS)).await
        }

        if !matches!(controller.is_started(), Ok(true)) {
            controller.set_config(&config)?;
            info!("Starting WiFi controller");
            controller.start_async().await?;
            info!("WiFi controller started");
        }

        info!("About to connect...");
        match controller.connect_async().await {
            Ok(()) => info!("Connected to WiFi network"),
            Err(error) => {
                error!("Failed to connect to WiFi network: {:?}", error);
                Timer::after(Duration::from_millis(WIFI_RECONNECT_DELAY_MILLISECONDS)).await;
            }
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Radio(InitializationError),
    Wifi(WifiError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Radio(e) => write!(f, "Radio init error: {:?}", e),
            Error::Wifi(e) => write!(f, "WiFi error: {:?}", e),
        }
    }
}

impl From<InitializationError> for Error {
    fn from(error: InitializationError) -> Self {
        Self::Radio(error)
    }
}

impl From<WifiError> for Error {
    fn from(error: WifiError) -> Self {
        Self::Wifi(error)
    }
}
