//! Minimal MQTT publish interface.
//!
//! Keeps the publish loop independent of the client crate, the rust-mqtt
//! session in the firmware implements it.

use core::fmt::Write;
use heapless::String;

/// Prefix + `/` + `<MAC>/<measurement>` must fit.
pub const TOPIC_CAPACITY: usize = 128;

pub type Topic = String<TOPIC_CAPACITY>;

/// Publish client bound to a topic prefix.
#[allow(async_fn_in_trait)]
pub trait MqttPublish {
    type Error: core::fmt::Debug;

    /// Process pending protocol work (keep-alive). Called once per loop
    /// iteration before the publish timer is checked.
    async fn service(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Publish `payload` to `topic`, QoS 0, not retained.
    ///
    /// `topic` is relative, implementations prepend their prefix.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;
}

/// Join the configured prefix and a relative topic.
///
/// An empty prefix leaves the topic untouched. Returns `None` when the result
/// does not fit [`TOPIC_CAPACITY`].
pub fn prefixed_topic(prefix: &str, topic: &str) -> Option<Topic> {
    let mut full = Topic::new();
    if prefix.is_empty() {
        full.push_str(topic).ok()?;
    } else {
        write!(full, "{}/{}", prefix.trim_end_matches('/'), topic).ok()?;
    }
    Some(full)
}
