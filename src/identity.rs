use core::fmt::{Display, Formatter, Write};
use heapless::String;

/// `XX:XX:XX:XX:XX:XX`
const IDENTITY_LENGTH: usize = 17;

/// Stable identifier of this node, derived from the station MAC address.
///
/// Used as the namespace of every published topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity(String<IDENTITY_LENGTH>);

impl DeviceIdentity {
    /// Format a hardware address as six colon separated uppercase hex pairs.
    ///
    /// An all-zero address means the radio did not hand out a MAC.
    pub fn from_mac(mac: [u8; 6]) -> Result<Self, Error> {
        if mac == [0u8; 6] {
            return Err(Error::Unavailable);
        }

        let mut text = String::new();
        for (i, byte) in mac.iter().enumerate() {
            if i > 0 {
                text.push(':').map_err(|_| Error::Unavailable)?;
            }
            write!(text, "{:02X}", byte).map_err(|_| Error::Unavailable)?;
        }
        Ok(Self(text))
    }

    /// Identity used when the MAC could not be read.
    ///
    /// Topics built from it start with `/`.
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for DeviceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Unavailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Unavailable => write!(f, "MAC address unavailable"),
        }
    }
}
