use embedded_hal::{delay::DelayNs, i2c::I2c};

/// Fixed I2C address of the BMP085/BMP180.
pub const ADDRESS: u8 = 0x77;

/// Value of the chip id register on both the BMP085 and the BMP180.
const CHIP_ID: u8 = 0x55;

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIBRATION: u8 = 0xAA;
const REG_CONTROL: u8 = 0xF4;
const REG_DATA: u8 = 0xF6;

const CMD_READ_TEMPERATURE: u8 = 0x2E;
const CMD_READ_PRESSURE: u8 = 0x34;

/// Error type for this driver.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// Bus error.
    I2c(E),
    /// Something answered at the address, but it is not a BMP085/BMP180.
    InvalidChipId(u8),
    /// [`Bmp180::init`] has not succeeded yet.
    NotInitialized,
}

/// Pressure oversampling setting, trades conversion time for noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversampling {
    UltraLowPower,
    Standard,
    HighResolution,
    #[default]
    UltraHighResolution,
}

impl Oversampling {
    fn bits(self) -> u8 {
        match self {
            Self::UltraLowPower => 0,
            Self::Standard => 1,
            Self::HighResolution => 2,
            Self::UltraHighResolution => 3,
        }
    }

    /// Maximum conversion time from the datasheet.
    fn conversion_time_ms(self) -> u32 {
        match self {
            Self::UltraLowPower => 5,
            Self::Standard => 8,
            Self::HighResolution => 14,
            Self::UltraHighResolution => 26,
        }
    }
}

/// Factory calibration coefficients, stored big-endian at 0xAA..0xBF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Calibration {
    ac1: i16,
    ac2: i16,
    ac3: i16,
    ac4: u16,
    ac5: u16,
    ac6: u16,
    b1: i16,
    b2: i16,
    // mb is part of the block but unused by the compensation
    mc: i16,
    md: i16,
}

impl Calibration {
    fn from_bytes(raw: &[u8; 22]) -> Self {
        let word = |i: usize| [raw[i], raw[i + 1]];
        Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(2)),
            ac3: i16::from_be_bytes(word(4)),
            ac4: u16::from_be_bytes(word(6)),
            ac5: u16::from_be_bytes(word(8)),
            ac6: u16::from_be_bytes(word(10)),
            b1: i16::from_be_bytes(word(12)),
            b2: i16::from_be_bytes(word(14)),
            mc: i16::from_be_bytes(word(18)),
            md: i16::from_be_bytes(word(20)),
        }
    }

    /// Intermediate temperature term shared by both compensations.
    fn b5(&self, raw_temperature: i32) -> i32 {
        let x1 = ((raw_temperature - i32::from(self.ac6)) * i32::from(self.ac5)) >> 15;
        let x2 = (i32::from(self.mc) << 11) / (x1 + i32::from(self.md));
        x1 + x2
    }

    /// Temperature in 0.1 °C.
    fn temperature(&self, raw_temperature: i32) -> i32 {
        (self.b5(raw_temperature) + 8) >> 4
    }

    /// Pressure in Pa, integer algorithm from the datasheet.
    fn pressure(&self, raw_temperature: i32, raw_pressure: i32, oss: u8) -> i32 {
        let b6 = self.b5(raw_temperature) - 4000;

        let x1 = (i32::from(self.b2) * ((b6 * b6) >> 12)) >> 11;
        let x2 = (i32::from(self.ac2) * b6) >> 11;
        let x3 = x1 + x2;
        let b3 = (((i32::from(self.ac1) * 4 + x3) << oss) + 2) / 4;

        let x1 = (i32::from(self.ac3) * b6) >> 13;
        let x2 = (i32::from(self.b1) * ((b6 * b6) >> 12)) >> 16;
        let x3 = ((x1 + x2) + 2) >> 2;
        let b4 = (u32::from(self.ac4) * (x3 + 32768) as u32) >> 15;
        let b7 = ((raw_pressure - b3) as u32).wrapping_mul(50000 >> oss);

        let p = if b7 < 0x8000_0000 {
            ((b7 * 2) / b4) as i32
        } else {
            ((b7 / b4) * 2) as i32
        };

        let x1 = (p >> 8) * (p >> 8);
        let x1 = (x1 * 3038) >> 16;
        let x2 = (-7357 * p) >> 16;
        p + ((x1 + x2 + 3791) >> 4)
    }
}

/// A BMP085 or BMP180 barometric pressure sensor.
pub struct Bmp180<I2C, D> {
    i2c: I2C,
    delay: D,
    oversampling: Oversampling,
    calibration: Option<Calibration>,
}

impl<I2C, D, E> Bmp180<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Creates a new driver, nothing is sent on the bus until [`Self::init`].
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_oversampling(i2c, delay, Oversampling::default())
    }

    pub fn with_oversampling(i2c: I2C, delay: D, oversampling: Oversampling) -> Self {
        Self {
            i2c,
            delay,
            oversampling,
            calibration: None,
        }
    }

    /// Checks the chip id and loads the calibration block.
    ///
    /// Fails when nothing answers on the bus, which is how presence is
    /// detected.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[REG_CHIP_ID], &mut id)
            .map_err(Error::I2c)?;
        if id[0] != CHIP_ID {
            return Err(Error::InvalidChipId(id[0]));
        }

        let mut raw = [0u8; 22];
        self.i2c
            .write_read(ADDRESS, &[REG_CALIBRATION], &mut raw)
            .map_err(Error::I2c)?;
        self.calibration = Some(Calibration::from_bytes(&raw));

        Ok(())
    }

    /// Reads the temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f32, Error<E>> {
        let calibration = self.calibration.ok_or(Error::NotInitialized)?;
        let raw_temperature = self.read_raw_temperature()?;
        Ok(calibration.temperature(raw_temperature) as f32 / 10.0)
    }

    /// Reads the pressure in Pa.
    ///
    /// Needs a fresh temperature conversion, so this talks to the sensor twice.
    pub fn read_pressure(&mut self) -> Result<f32, Error<E>> {
        let calibration = self.calibration.ok_or(Error::NotInitialized)?;
        let raw_temperature = self.read_raw_temperature()?;
        let raw_pressure = self.read_raw_pressure()?;
        let oss = self.oversampling.bits();
        Ok(calibration.pressure(raw_temperature, raw_pressure, oss) as f32)
    }

    fn read_raw_temperature(&mut self) -> Result<i32, Error<E>> {
        self.i2c
            .write(ADDRESS, &[REG_CONTROL, CMD_READ_TEMPERATURE])
            .map_err(Error::I2c)?;
        self.delay.delay_ms(5);

        let mut data = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[REG_DATA], &mut data)
            .map_err(Error::I2c)?;
        Ok(i32::from(u16::from_be_bytes(data)))
    }

    fn read_raw_pressure(&mut self) -> Result<i32, Error<E>> {
        let oss = self.oversampling.bits();
        self.i2c
            .write(ADDRESS, &[REG_CONTROL, CMD_READ_PRESSURE + (oss << 6)])
            .map_err(Error::I2c)?;
        self.delay.delay_ms(self.oversampling.conversion_time_ms());

        let mut data = [0u8; 3];
        self.i2c
            .write_read(ADDRESS, &[REG_DATA], &mut data)
            .map_err(Error::I2c)?;
        let raw = (i32::from(data[0]) << 16) | (i32::from(data[1]) << 8) | i32::from(data[2]);
        Ok(raw >> (8 - oss))
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    /// Calibration block from the datasheet worked example.
    const DATASHEET_CALIBRATION: [u8; 22] = [
        0x01, 0x98, 0xff, 0xb8, 0xc7, 0xd1, 0x7f, 0xe5, 0x7f, 0xf5, 0x5a, 0x71, 0x18, 0x2e, 0x00,
        0x04, 0x80, 0x00, 0xdd, 0xf9, 0x0b, 0x34,
    ];

    /// Register file behind a fake bus. Conversions complete instantly and
    /// load `ut` or `up` into the data registers.
    struct FakeBus {
        registers: [u8; 256],
        pointer: u8,
        ut: u16,
        up: u32,
        present: bool,
        last_command: Option<u8>,
    }

    impl FakeBus {
        fn datasheet_example(oss: u8) -> Self {
            let mut registers = [0u8; 256];
            registers[REG_CHIP_ID as usize] = CHIP_ID;
            let start = REG_CALIBRATION as usize;
            registers[start..start + 22].copy_from_slice(&DATASHEET_CALIBRATION);
            Self {
                registers,
                pointer: 0,
                ut: 27898,
                up: 23843 << (8 - oss),
                present: true,
                last_command: None,
            }
        }

        fn absent() -> Self {
            Self {
                present: false,
                ..Self::datasheet_example(0)
            }
        }

        fn write_register(&mut self, register: u8, value: u8) {
            self.registers[register as usize] = value;
            if register == REG_CONTROL {
                self.last_command = Some(value);
                let data = REG_DATA as usize;
                if value == CMD_READ_TEMPERATURE {
                    self.registers[data..data + 2].copy_from_slice(&self.ut.to_be_bytes());
                } else if (value & 0x3f) == CMD_READ_PRESSURE {
                    self.registers[data..data + 3].copy_from_slice(&self.up.to_be_bytes()[1..]);
                }
            }
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if !self.present || address != ADDRESS {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for operation in operations {
                match operation {
                    Operation::Write(bytes) => {
                        if let Some((register, values)) = bytes.split_first() {
                            self.pointer = *register;
                            for value in values {
                                self.write_register(self.pointer, *value);
                                self.pointer = self.pointer.wrapping_add(1);
                            }
                        }
                    }
                    Operation::Read(buffer) => {
                        for byte in buffer.iter_mut() {
                            *byte = self.registers[self.pointer as usize];
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn datasheet_temperature() {
        let mut sensor = Bmp180::with_oversampling(
            FakeBus::datasheet_example(0),
            NoDelay,
            Oversampling::UltraLowPower,
        );
        sensor.init().unwrap();
        assert_eq!(sensor.read_temperature().unwrap(), 15.0);
    }

    #[test]
    fn datasheet_pressure() {
        let mut sensor = Bmp180::with_oversampling(
            FakeBus::datasheet_example(0),
            NoDelay,
            Oversampling::UltraLowPower,
        );
        sensor.init().unwrap();
        assert_eq!(sensor.read_pressure().unwrap(), 69964.0);
    }

    #[test]
    fn pressure_command_carries_oversampling() {
        let mut sensor = Bmp180::new(FakeBus::datasheet_example(3), NoDelay);
        sensor.init().unwrap();
        sensor.read_pressure().unwrap();
        let bus = sensor.release();
        assert_eq!(bus.last_command, Some(CMD_READ_PRESSURE | (3 << 6)));
    }

    #[test]
    fn ultra_high_resolution_pressure() {
        // 19 bit UP, eight times the single sample reading
        let mut bus = FakeBus::datasheet_example(3);
        bus.up = 190_744 << 5;
        let mut sensor = Bmp180::new(bus, NoDelay);
        sensor.init().unwrap();
        assert_eq!(sensor.read_pressure().unwrap(), 69963.0);
    }

    #[test]
    fn missing_sensor_fails_init() {
        let mut sensor = Bmp180::new(FakeBus::absent(), NoDelay);
        assert_eq!(
            sensor.init(),
            Err(Error::I2c(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address
            )))
        );
    }

    #[test]
    fn wrong_chip_id_fails_init() {
        let mut bus = FakeBus::datasheet_example(0);
        bus.registers[REG_CHIP_ID as usize] = 0x58;
        let mut sensor = Bmp180::new(bus, NoDelay);
        assert_eq!(sensor.init(), Err(Error::InvalidChipId(0x58)));
    }

    #[test]
    fn reading_before_init_fails() {
        let mut sensor = Bmp180::new(FakeBus::datasheet_example(0), NoDelay);
        assert_eq!(sensor.read_temperature(), Err(Error::NotInitialized));
    }
}
