use core::num::ParseIntError;
use embassy_net::{
    dns::{DnsQueryType, Error as DnsError},
    tcp::{ConnectError, TcpSocket},
    Stack,
};
use embassy_time::{Duration, Instant};
use log::{info, warn};
use rust_mqtt::{
    client::{
        client::MqttClient,
        client_config::{ClientConfig, MqttVersion::MQTTv5},
    },
    packet::v5::{publish_packet::QualityOfService, reason_codes::ReasonCode},
    utils::rng_generator::CountingRng,
};
use sensor_node::{
    config::MQTT_KEEP_ALIVE_SECONDS,
    mqtt::{prefixed_topic, MqttPublish},
};
use static_cell::StaticCell;

const BUFFER_SIZE: usize = 4096;
const BUFFER_SIZE_CLIENT: usize = 1024;

pub struct MqttResources {
    rx_buffer: [u8; BUFFER_SIZE],
    tx_buffer: [u8; BUFFER_SIZE],
    client_rx_buffer: [u8; BUFFER_SIZE_CLIENT],
    client_tx_buffer: [u8; BUFFER_SIZE_CLIENT],
}

static RESOURCES: StaticCell<MqttResources> = StaticCell::new();

/// Socket and client buffers, reused by every session.
pub fn resources() -> &'static mut MqttResources {
    RESOURCES.init(MqttResources {
        rx_buffer: [0u8; BUFFER_SIZE],
        tx_buffer: [0u8; BUFFER_SIZE],
        client_rx_buffer: [0u8; BUFFER_SIZE_CLIENT],
        client_tx_buffer: [0u8; BUFFER_SIZE_CLIENT],
    })
}

/// Broker and login, all from build-time environment
pub struct BrokerConfig {
    pub hostname: &'static str,
    pub port: &'static str,
    pub client_id: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub topic_prefix: &'static str,
}

type MqttClientImpl<'a> = MqttClient<'a, TcpSocket<'a>, 5, CountingRng>;

/// A connected broker session publishing below a topic prefix.
pub struct MqttSession<'a> {
    client: MqttClientImpl<'a>,
    topic_prefix: &'static str,
    last_ping: Instant,
    healthy: bool,
}

impl MqttSession<'_> {
    /// False once a ping or publish failed, the session must be rebuilt.
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }
}

pub async fn connect<'a>(
    stack: Stack<'static>,
    resources: &'a mut MqttResources,
    broker: &BrokerConfig,
) -> Result<MqttSession<'a>, Error> {
    let mut socket = TcpSocket::new(stack, &mut resources.rx_buffer, &mut resources.tx_buffer);

    let host_addr = stack
        .dns_query(broker.hostname, DnsQueryType::A)
        .await
        .map(|a| a[0])?;

    let port = broker.port.parse()?;
    let socket_addr = (host_addr, port);

    info!("Connecting to MQTT server {}:{}...", broker.hostname, port);
    socket.connect(socket_addr).await?;
    info!("Connected to MQTT server");

    info!("Initializing MQTT connection");
    let mut mqtt_config: ClientConfig<5, CountingRng> =
        ClientConfig::new(MQTTv5, CountingRng(20000));
    if !broker.username.is_empty() {
        mqtt_config.add_username(broker.username);
        mqtt_config.add_password(broker.password);
    }
    mqtt_config.add_client_id(broker.client_id);
    mqtt_config.keep_alive = MQTT_KEEP_ALIVE_SECONDS;

    let mut client = MqttClient::new(
        socket,
        &mut resources.client_tx_buffer,
        BUFFER_SIZE_CLIENT,
        &mut resources.client_rx_buffer,
        BUFFER_SIZE_CLIENT,
        mqtt_config,
    );

    client.connect_to_broker().await?;

    info!("MQTT Broker connected");

    Ok(MqttSession {
        client,
        topic_prefix: broker.topic_prefix,
        last_ping: Instant::now(),
        healthy: true,
    })
}

impl MqttPublish for MqttSession<'_> {
    type Error = ReasonCode;

    /// Ping the broker at half the keep-alive interval.
    async fn service(&mut self) -> Result<(), Self::Error> {
        let ping_interval = Duration::from_secs(u64::from(MQTT_KEEP_ALIVE_SECONDS) / 2);
        if self.last_ping.elapsed() < ping_interval {
            return Ok(());
        }
        self.last_ping = Instant::now();

        if let Err(e) = self.client.send_ping().await {
            self.healthy = false;
            return Err(e);
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let Some(topic_name) = prefixed_topic(self.topic_prefix, topic) else {
            warn!("Topic {} does not fit below prefix {}", topic, self.topic_prefix);
            return Err(ReasonCode::TopicNameInvalid);
        };

        match self
            .client
            .send_message(&topic_name, payload, QualityOfService::QoS0, false)
            .await
        {
            // published, just nobody listening
            Ok(()) | Err(ReasonCode::NoMatchingSubscribers) => Ok(()),
            Err(e) => {
                self.healthy = false;
                Err(e)
            }
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Port,
    Dns(DnsError),
    Connection(ConnectError),
    Broker(ReasonCode),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Port => write!(f, "Port error"),
            Error::Dns(e) => write!(f, "DNS error: {:?}", e),
            Error::Connection(e) => write!(f, "Connection error: {:?}", e),
            Error::Broker(e) => write!(f, "Broker error: {:?}", e),
        }
    }
}

impl From<DnsError> for Error {
    fn from(error: DnsError) -> Self {
        Self::Dns(error)
    }
}

impl From<ConnectError> for Error {
    fn from(error: ConnectError) -> Self {
        Self::Connection(error)
    }
}

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Self {
        Self::Port
    }
}

impl From<ReasonCode> for Error {
    fn from(error: ReasonCode) -> Self {
        Self::Broker(error)
    }
}
