//! The sensor publish loop.
//!
//! [`SensorNode`] owns everything that survives between loop iterations:
//! the device identity, the barometer if one answered at startup, the
//! onboard fallback sensor and the publish timer.

use core::fmt::{Debug, Write};
use embedded_hal::{delay::DelayNs, i2c::I2c};
use heapless::String;
use log::{error, info, warn};

use crate::{
    bmp180::{self, Bmp180},
    config::CHIP_TEMPERATURE_OFFSET_CELSIUS,
    domain::Measurement,
    identity::DeviceIdentity,
    mqtt::MqttPublish,
};

/// `<MAC>/<measurement>`
const RELATIVE_TOPIC_CAPACITY: usize = 32;

/// External pressure/temperature sensor
pub trait Barometer {
    type Error: Debug;

    /// Probe and configure the sensor
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Read temperature in Celsius
    fn read_temperature(&mut self) -> Result<f32, Self::Error>;

    /// Read pressure in Pa
    fn read_pressure(&mut self) -> Result<f32, Self::Error>;
}

/// The MCU's internal temperature sensor
pub trait ChipThermometer {
    /// Raw die temperature in Celsius, well above ambient
    fn read_celsius(&mut self) -> f32;
}

/// A chip sensor that failed to start reads as NaN.
impl<C: ChipThermometer> ChipThermometer for Option<C> {
    fn read_celsius(&mut self) -> f32 {
        self.as_mut().map_or(f32::NAN, C::read_celsius)
    }
}

impl<I2C, D, E> Barometer for Bmp180<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: Debug,
{
    type Error = bmp180::Error<E>;

    fn init(&mut self) -> Result<(), Self::Error> {
        Bmp180::init(self)
    }

    fn read_temperature(&mut self) -> Result<f32, Self::Error> {
        Bmp180::read_temperature(self)
    }

    fn read_pressure(&mut self) -> Result<f32, Self::Error> {
        Bmp180::read_pressure(self)
    }
}

/// Initialize the barometer, `None` means the node runs on the chip sensor.
///
/// Takes the result of building the bus as well, a bus that could not be
/// configured is treated like a sensor that does not answer. Never fails, a
/// missing sensor only changes which readings are published.
pub fn probe_barometer<B, E>(barometer: Result<B, E>) -> Option<B>
where
    B: Barometer,
    E: Debug,
{
    let mut barometer = match barometer {
        Ok(barometer) => barometer,
        Err(e) => {
            warn!(
                "Could not find a valid BMP085 sensor (bus: {:?}), switching to onboard!",
                e
            );
            return None;
        }
    };

    match barometer.init() {
        Ok(()) => {
            info!("BMP085 sensor found");
            Some(barometer)
        }
        Err(e) => {
            warn!(
                "Could not find a valid BMP085 sensor ({:?}), switching to onboard!",
                e
            );
            None
        }
    }
}

/// Decides whether a loop iteration takes a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishTimer {
    last_publish_ms: u64,
    interval_ms: u64,
}

impl PublishTimer {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            last_publish_ms: 0,
            interval_ms,
        }
    }

    /// Returns true and restarts the interval when at least `interval_ms`
    /// passed since the last publish.
    pub fn check(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_publish_ms) < self.interval_ms {
            return false;
        }
        self.last_publish_ms = now_ms;
        true
    }

    pub fn last_publish_ms(&self) -> u64 {
        self.last_publish_ms
    }
}

/// What a single [`SensorNode::poll`] did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// The interval elapsed and sensors were read
    pub measured: bool,
    pub published: u8,
    pub failed: u8,
}

pub struct SensorNode<B, C> {
    identity: DeviceIdentity,
    barometer: Option<B>,
    chip: C,
    timer: PublishTimer,
}

impl<B, C> SensorNode<B, C>
where
    B: Barometer,
    C: ChipThermometer,
{
    pub fn new(
        identity: DeviceIdentity,
        barometer: Option<B>,
        chip: C,
        interval_ms: u64,
    ) -> Self {
        if identity.is_unset() {
            warn!("No device identity, topics start with '/'");
        }
        Self {
            identity,
            barometer,
            chip,
            timer: PublishTimer::new(interval_ms),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn is_sensor_attached(&self) -> bool {
        self.barometer.is_some()
    }

    pub fn timer(&self) -> &PublishTimer {
        &self.timer
    }

    /// One iteration of the main loop.
    ///
    /// Services the client, then, once per interval, reads the sensors and
    /// publishes pressure (barometer only) and temperature. Read failures are
    /// published as NaN and publish failures are only logged.
    pub async fn poll<P: MqttPublish>(&mut self, now_ms: u64, mqtt: &mut P) -> PollReport {
        if let Err(e) = mqtt.service().await {
            warn!("MQTT service failed: {:?}", e);
        }

        let mut report = PollReport::default();
        if !self.timer.check(now_ms) {
            return report;
        }
        report.measured = true;

        let temperature = match self.barometer.as_mut() {
            Some(barometer) => {
                let temperature = value_or_nan(barometer.read_temperature(), "temperature");
                let pressure = value_or_nan(barometer.read_pressure(), "pressure");
                publish(
                    &self.identity,
                    mqtt,
                    Measurement::Pressure(pressure),
                    &mut report,
                )
                .await;
                temperature
            }
            None => self.chip.read_celsius() - CHIP_TEMPERATURE_OFFSET_CELSIUS,
        };

        publish(
            &self.identity,
            mqtt,
            Measurement::Temperature(temperature),
            &mut report,
        )
        .await;

        report
    }
}

fn value_or_nan<E: Debug>(reading: Result<f32, E>, what: &str) -> f32 {
    reading.unwrap_or_else(|e| {
        error!("Error reading {}: {:?}", what, e);
        f32::NAN
    })
}

async fn publish<P: MqttPublish>(
    identity: &DeviceIdentity,
    mqtt: &mut P,
    measurement: Measurement,
    report: &mut PollReport,
) {
    let mut topic = String::<RELATIVE_TOPIC_CAPACITY>::new();
    if write!(topic, "{}/{}", identity, measurement.topic()).is_err() {
        error!("Topic for {} does not fit", measurement.topic());
        report.failed += 1;
        return;
    }
    let payload = measurement.payload();

    match mqtt.publish(&topic, payload.as_bytes()).await {
        Ok(()) => {
            info!("{} {} ({})", topic, payload, measurement);
            report.published += 1;
        }
        Err(e) => {
            error!("Error publishing {} to {}: {:?}", payload, topic, e);
            report.failed += 1;
        }
    }
}
