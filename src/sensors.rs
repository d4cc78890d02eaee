use esp_hal::{
    delay::Delay,
    gpio::AnyPin,
    i2c::master::{Config as I2cConfig, ConfigError, I2c},
    peripherals::{I2C0, TSENS},
    time::Rate,
    tsens::{self, TemperatureSensor},
    Blocking,
};
use sensor_node::{
    bmp180::Bmp180, config::I2C_FREQUENCY_KHZ, node::ChipThermometer,
};

pub type Barometer = Bmp180<I2c<'static, Blocking>, Delay>;

/// BMP085/BMP180 on I2C0, not probed yet
pub fn barometer<SDA, SCL>(
    i2c0: I2C0<'static>,
    sda: SDA,
    scl: SCL,
) -> Result<Barometer, ConfigError>
where
    SDA: Into<AnyPin<'static>>,
    SCL: Into<AnyPin<'static>>,
{
    let i2c = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )?
    .with_sda(sda.into())
    .with_scl(scl.into());

    Ok(Bmp180::new(i2c, Delay::new()))
}

/// The die temperature sensor of the ESP32-S3
pub struct OnboardThermometer<'d> {
    sensor: TemperatureSensor<'d>,
}

impl<'d> OnboardThermometer<'d> {
    pub fn new(tsens: TSENS<'d>) -> Result<Self, tsens::ConfigError> {
        let sensor = TemperatureSensor::new(tsens, tsens::Config::default())?;
        Ok(Self { sensor })
    }
}

impl ChipThermometer for OnboardThermometer<'_> {
    fn read_celsius(&mut self) -> f32 {
        self.sensor.get_temperature().to_celsius()
    }
}
