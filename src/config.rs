/// Time between two measurement/publish rounds
pub const PUBLISH_INTERVAL_MILLISECONDS: u64 = 5000;
/// How often the main loop services MQTT and checks the publish timer
pub const LOOP_TICK_MILLISECONDS: u64 = 100;
/// Delay after power-up before anything is logged
pub const STARTUP_SETTLE_MILLISECONDS: u64 = 1000;
// the chip sensor sits next to the CPU and reads this much above ambient
pub const CHIP_TEMPERATURE_OFFSET_CELSIUS: f32 = 15.0;

pub const MQTT_KEEP_ALIVE_SECONDS: u16 = 60;
pub const MQTT_RECONNECT_DELAY_MILLISECONDS: u64 = 5000;
pub const WIFI_RECONNECT_DELAY_MILLISECONDS: u64 = 5000;

pub const I2C_FREQUENCY_KHZ: u32 = 100;
