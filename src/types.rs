use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data-point codes reported by Tuya pool heat pumps.
pub mod dp {
    pub const SWITCH: &str = "switch";
    pub const MODE: &str = "mode";
    pub const TEMP_CURRENT: &str = "temp_current";
    pub const SET_HEATING_TEMP: &str = "set_heating_temp";
    pub const SET_COOLING_TEMP: &str = "set_cold_temp";
    pub const SET_AUTO_TEMP: &str = "set_auto_temp";
}

/// Value of a single data point. The vendor mixes booleans, integers,
/// decimals and strings under one `value` key; anything else is kept raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DpValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Other(Value),
}

impl DpValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DpValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DpValue::Integer(i) => Some(*i),
            DpValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DpValue::Integer(i) => Some(*i as f64),
            DpValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DpValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DpValue::Bool(b) => write!(f, "{b}"),
            DpValue::Integer(i) => write!(f, "{i}"),
            DpValue::Float(x) => write!(f, "{x}"),
            DpValue::String(s) => f.write_str(s),
            DpValue::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for DpValue {
    fn from(v: bool) -> Self {
        DpValue::Bool(v)
    }
}

impl From<i64> for DpValue {
    fn from(v: i64) -> Self {
        DpValue::Integer(v)
    }
}

impl From<i32> for DpValue {
    fn from(v: i32) -> Self {
        DpValue::Integer(v.into())
    }
}

impl From<f64> for DpValue {
    fn from(v: f64) -> Self {
        DpValue::Float(v)
    }
}

impl From<&str> for DpValue {
    fn from(v: &str) -> Self {
        DpValue::String(v.to_string())
    }
}

impl From<String> for DpValue {
    fn from(v: String) -> Self {
        DpValue::String(v)
    }
}

/// One `{code, value}` pair as reported by `/devices/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub code: String,
    pub value: DpValue,
}

impl DeviceStatus {
    pub fn new(code: impl Into<String>, value: impl Into<DpValue>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// One `{code, value}` pair sent to `/devices/{id}/commands`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub code: String,
    pub value: DpValue,
}

impl Command {
    pub fn new(code: impl Into<String>, value: impl Into<DpValue>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// Tuya stores temperatures as tenths of a degree Celsius.
pub const TEMP_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn from_tuya(raw: i64) -> Self {
        Self(raw as f64 / TEMP_SCALE)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }

    /// Scaled integer for `set_*_temp` commands.
    pub fn to_tuya(&self) -> i64 {
        (self.0 * TEMP_SCALE).round() as i64
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMode {
    Auto,
    HeatingSmart,
    HeatingPowerful,
    HeatingSilent,
    CoolingSmart,
    CoolingPowerful,
    CoolingSilent,
}

impl PumpMode {
    pub fn as_tuya_str(&self) -> &'static str {
        match self {
            PumpMode::Auto => "Auto",
            PumpMode::HeatingSmart => "Heating_Smart",
            PumpMode::HeatingPowerful => "Heating_Powerful",
            PumpMode::HeatingSilent => "Heating_Silent",
            PumpMode::CoolingSmart => "Cooling_Smart",
            PumpMode::CoolingPowerful => "Cooling_Powerful",
            PumpMode::CoolingSilent => "Cooling_Silent",
        }
    }

    pub fn from_tuya_str(s: &str) -> Option<Self> {
        match s {
            "Auto" => Some(PumpMode::Auto),
            "Heating_Smart" => Some(PumpMode::HeatingSmart),
            "Heating_Powerful" => Some(PumpMode::HeatingPowerful),
            "Heating_Silent" => Some(PumpMode::HeatingSilent),
            "Cooling_Smart" => Some(PumpMode::CoolingSmart),
            "Cooling_Powerful" => Some(PumpMode::CoolingPowerful),
            "Cooling_Silent" => Some(PumpMode::CoolingSilent),
            _ => None,
        }
    }

    pub fn is_heating(&self) -> bool {
        is_heating_mode(self.as_tuya_str())
    }

    pub fn is_cooling(&self) -> bool {
        is_cooling_mode(self.as_tuya_str())
    }
}

// Firmware variants report modes outside the known set, so classification
// works on the raw string.
pub fn is_heating_mode(mode: &str) -> bool {
    mode.to_lowercase().contains("heating")
}

pub fn is_cooling_mode(mode: &str) -> bool {
    mode.to_lowercase().contains("cooling")
}

pub fn is_auto_mode(mode: &str) -> bool {
    mode.eq_ignore_ascii_case("auto")
}

/// Setpoint bounds in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

impl TempRange {
    pub const HEATING: TempRange = TempRange { min: 5.0, max: 55.0 };
    pub const COOLING: TempRange = TempRange { min: 5.0, max: 35.0 };
    pub const AUTO: TempRange = TempRange { min: 5.0, max: 40.0 };

    pub fn contains(&self, t: Temperature) -> bool {
        (self.min..=self.max).contains(&t.celsius())
    }
}

/// Typed view over a status list. Missing or mistyped points stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatPumpState {
    pub active: Option<bool>,
    pub mode: Option<String>,
    pub current_temperature: Option<Temperature>,
    pub heating_setpoint: Option<Temperature>,
    pub cooling_setpoint: Option<Temperature>,
    pub auto_setpoint: Option<Temperature>,
}

impl HeatPumpState {
    pub fn from_status(status: &[DeviceStatus]) -> Self {
        let mut state = Self::default();
        for point in status {
            let temp = || point.value.as_i64().map(Temperature::from_tuya);
            match point.code.as_str() {
                dp::SWITCH => state.active = point.value.as_bool(),
                dp::MODE => state.mode = point.value.as_str().map(str::to_string),
                dp::TEMP_CURRENT => state.current_temperature = temp(),
                dp::SET_HEATING_TEMP => state.heating_setpoint = temp(),
                dp::SET_COOLING_TEMP => state.cooling_setpoint = temp(),
                dp::SET_AUTO_TEMP => state.auto_setpoint = temp(),
                _ => {}
            }
        }
        state
    }

    pub fn pump_mode(&self) -> Option<PumpMode> {
        self.mode.as_deref().and_then(PumpMode::from_tuya_str)
    }

    /// Setpoint that applies to the current mode.
    pub fn target_temperature(&self) -> Option<Temperature> {
        let mode = self.mode.as_deref()?;
        if is_heating_mode(mode) {
            self.heating_setpoint
        } else if is_cooling_mode(mode) {
            self.cooling_setpoint
        } else {
            self.auto_setpoint
        }
    }
}

/// Events emitted by the poller when a device's status changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StatusChanged {
        device_id: String,
        code: String,
        value: DpValue,
    },
}
