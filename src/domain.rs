use core::fmt::{Display, Formatter, Result, Write};
use heapless::String;

/// Longest payload we render, `{"value": -3.40282347e38}` printed with two
/// decimals still fits.
pub const PAYLOAD_CAPACITY: usize = 64;

pub type Payload = String<PAYLOAD_CAPACITY>;

/// A single reading taken during one publish round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Temperature(f32), // °C
    Pressure(f32),    // Pa
}

impl Measurement {
    /// Get the MQTT topic suffix for the measurement
    pub fn topic(&self) -> &'static str {
        match self {
            Measurement::Temperature(_) => "temperature",
            Measurement::Pressure(_) => "pressure",
        }
    }

    /// Get the unit of the measurement value
    pub fn unit(&self) -> &'static str {
        match self {
            Measurement::Temperature(_) => "°C",
            Measurement::Pressure(_) => "Pa",
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            Measurement::Temperature(v) | Measurement::Pressure(v) => *v,
        }
    }

    /// Render the JSON payload `{"value": <number>}`.
    ///
    /// The number always carries two decimals, NaN is rendered as-is.
    pub fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        // cannot overflow, see PAYLOAD_CAPACITY
        let _ = write!(payload, "{{\"value\": {:.2}}}", self.value());
        payload
    }
}

impl Display for Measurement {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}: {:.2}{}", self.topic(), self.value(), self.unit())
    }
}
