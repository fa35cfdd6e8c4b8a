use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv4Addr;

/// Which channel model the controller is currently driven by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Raw,
    Hsv,
}

/// Last known output of the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorState {
    /// Color temperature in Kelvin
    pub color_temp: i64,
    /// Hue, 0-360
    pub hue: i64,
    /// Saturation, 0-100
    pub saturation: i64,
    /// Brightness (value), 0-100
    pub brightness: i64,
    pub color_mode: ColorMode,
    /// Raw diode levels, 0-1023
    pub raw_r: i64,
    pub raw_g: i64,
    pub raw_b: i64,
    pub raw_cw: i64,
    pub raw_ww: i64,
}

impl ColorState {
    /// Merge the `hsv`, `raw` and `mode` members of a color message.
    ///
    /// Keys missing from the message keep their previous value.
    pub fn merge(&mut self, params: &Value) {
        if let Some(hsv) = params.get("hsv") {
            merge_field(&mut self.hue, hsv, "h");
            merge_field(&mut self.saturation, hsv, "s");
            merge_field(&mut self.brightness, hsv, "v");
            merge_field(&mut self.color_temp, hsv, "ct");
        }

        if let Some(raw) = params.get("raw") {
            merge_field(&mut self.raw_r, raw, "r");
            merge_field(&mut self.raw_g, raw, "g");
            merge_field(&mut self.raw_b, raw, "b");
            merge_field(&mut self.raw_cw, raw, "cw");
            merge_field(&mut self.raw_ww, raw, "ww");
        }

        if let Some(mode) = params.get("mode") {
            match serde_json::from_value::<ColorMode>(mode.clone()) {
                Ok(mode) => self.color_mode = mode,
                Err(_) => tracing::debug!("Ignoring unknown color mode {}", mode),
            }
        }
    }
}

fn merge_field(target: &mut i64, obj: &Value, key: &str) {
    let Some(value) = obj.get(key) else { return };
    if let Some(n) = value.as_i64() {
        *target = n;
    } else if let Some(f) = value.as_f64() {
        *target = f.round() as i64;
    }
}

/// Clock synchronisation status reported by a slave controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSlaveStatus {
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub current_interval: i64,
}

/// Animation channel addressed by pause/continue/stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "h")]
    Hue,
    #[serde(rename = "s")]
    Saturation,
    #[serde(rename = "v")]
    Value,
    #[serde(rename = "ct")]
    ColorTemp,
}

/// Control applied to running animations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCommand {
    Pause,
    Continue,
    Stop,
}

/// Controller found by a network scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredController {
    pub ip: Ipv4Addr,
    pub mac: String,
    /// Full `/info` document
    pub info: Value,
}
