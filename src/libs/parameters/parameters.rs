use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fmt;

use lazy_static::lazy_static;
use log::warn;
use serde_derive::Deserialize;
use serde_derive::Serialize;

// A single instrument setting or status value. The UI reports booleans as 0/1, the device
// may echo either form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParameterValue::Number(n) => Some(*n),
            ParameterValue::Text(_) => None,
        }
    }

    // Loose comparison, so that an edit of 1 against a confirmed `true` is not a change.
    pub fn same_as(&self, other: &ParameterValue) -> bool {
        match (self, other) {
            (ParameterValue::Text(a), ParameterValue::Text(b)) => a == b,
            (ParameterValue::Text(_), _) | (_, ParameterValue::Text(_)) => false,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Display for ParameterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Flag(b) => write!(f, "{}", b),
            ParameterValue::Number(n) => write!(f, "{}", n),
            ParameterValue::Text(t) => write!(f, "'{}'", t),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        ParameterValue::Number(n)
    }
}

impl From<i32> for ParameterValue {
    fn from(n: i32) -> Self {
        ParameterValue::Number(n as f64)
    }
}

impl From<bool> for ParameterValue {
    fn from(b: bool) -> Self {
        ParameterValue::Flag(b)
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::Text(s.to_string())
    }
}

// Parses a command-line style value: true/false, a number, or else free text.
pub fn parse_value(text: &str) -> ParameterValue {
    match text.trim() {
        "true" => ParameterValue::Flag(true),
        "false" => ParameterValue::Flag(false),
        trimmed => match trimmed.parse::<f64>() {
            Ok(n) => ParameterValue::Number(n),
            Err(_) => ParameterValue::Text(trimmed.to_string()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    Float,    // _f: carried as an SE/HI/LO triple
    Integer,  // _i
    Selector, // _s: discrete choice
    Flag,     // _run: 0/1
    Other,
}

pub fn kind_of(key: &str) -> ParameterKind {
    if key.ends_with("_f") {
        ParameterKind::Float
    } else if key.ends_with("_i") {
        ParameterKind::Integer
    } else if key.ends_with("_s") {
        ParameterKind::Selector
    } else if key.ends_with("_run") || key == "rb_run" {
        ParameterKind::Flag
    } else {
        ParameterKind::Other
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterSet {
    pub fn new() -> ParameterSet {
        ParameterSet { values: BTreeMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert<V: Into<ParameterValue>>(&mut self, key: &str, value: V) -> Option<ParameterValue> {
        self.values.insert(key.to_string(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<ParameterValue> {
        self.values.remove(key)
    }

    // Entries of `other` win.
    pub fn merge(&mut self, other: &ParameterSet) {
        for (key, value) in other.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ParameterValue> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a ParameterValue);
    type IntoIter = btree_map::Iter<'a, String, ParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> std::iter::FromIterator<(K, V)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ParameterSet { values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// The limits the RadioBox server applies to a known parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub read_only: bool,
    pub min: f64,
    pub max: f64,
}

impl ParameterDescriptor {
    const fn writable(name: &'static str, min: f64, max: f64) -> ParameterDescriptor {
        ParameterDescriptor { name, read_only: false, min, max }
    }

    const fn read_only(name: &'static str, min: f64, max: f64) -> ParameterDescriptor {
        ParameterDescriptor { name, read_only: true, min, max }
    }

    /// Clamps numeric values into `[min, max]`; flags and text pass through.
    pub fn constrain(&self, value: ParameterValue) -> ParameterValue {
        match value {
            ParameterValue::Number(n) if n < self.min => {
                warn!("Incorrect value {} for {} (min:{}), correcting it", n, self.name, self.min);
                ParameterValue::Number(self.min)
            }
            ParameterValue::Number(n) if n > self.max => {
                warn!("Incorrect value {} for {} (max:{}), correcting it", n, self.name, self.max);
                ParameterValue::Number(self.max)
            }
            other => other,
        }
    }
}

lazy_static! {
    pub static ref RADIOBOX_PARAMETERS: Vec<ParameterDescriptor> = vec![
        ParameterDescriptor::writable("rb_run", 0.0, 1.0),
        ParameterDescriptor::writable("osc1_qrg_i", 0.0, 125_000_000.0),     // Hz
        ParameterDescriptor::writable("osc1_amp_i", 0.0, 2_048_000.0),       // µV
        ParameterDescriptor::writable("osc1_modsrc_s", 0.0, 2.0),            // none, VCO2, XADC0
        ParameterDescriptor::writable("osc1_modtyp_s", 0.0, 2.0),            // AM, FM, PM
        ParameterDescriptor::writable("osc2_qrg_i", 0.0, 125_000_000.0),
        ParameterDescriptor::writable("osc2_mag_i", 0.0, 1_000_000.0),       // AM:%, FM:Hz, PM:°
        ParameterDescriptor::writable("rb_add_a_i", 0.0, 1000.0),
        ParameterDescriptor::writable("rb_add_b_i", 0.0, 1000.0),
        ParameterDescriptor::read_only("rb_add_res_i", 0.0, 10000.0),
        ParameterDescriptor::writable("tx_modsrc_s", 0.0, 15.0),
        ParameterDescriptor::writable("tx_modtyp_s", 0.0, 15.0),
        ParameterDescriptor::writable("rx_modtyp_s", 0.0, 15.0),
        ParameterDescriptor::writable("rx_muxin_src_s", 0.0, 15.0),
        ParameterDescriptor::writable("tx_car_osc_qrg_f", 0.0, 62_500_000.0),
        ParameterDescriptor::writable("tx_mod_osc_qrg_f", 0.0, 62_500_000.0),
        ParameterDescriptor::writable("tx_amp_rf_gain_f", 0.0, 2048.0),
        ParameterDescriptor::writable("tx_mod_osc_mag_f", 0.0, 1_000_000.0),
        ParameterDescriptor::writable("tx_muxin_gain_f", 0.0, 100.0),
        ParameterDescriptor::writable("rx_muxin_gain_f", 0.0, 100.0),
        ParameterDescriptor::writable("rx_car_osc_qrg_f", 0.0, 62_500_000.0),
    ];
}

pub fn descriptor_for(key: &str) -> Option<&'static ParameterDescriptor> {
    RADIOBOX_PARAMETERS.iter().find(|d| d.name == key)
}

// The bootstrap set sent before the device has told us anything.
pub fn default_init_parameters() -> ParameterSet {
    RADIOBOX_PARAMETERS
        .iter()
        .filter(|d| !d.read_only)
        .map(|d| {
            let value = if kind_of(d.name) == ParameterKind::Flag { ParameterValue::Flag(false) } else { ParameterValue::Number(0.0) };
            (d.name, value)
        })
        .collect()
}

#[cfg(test)]
#[path = "./parameters_spec.rs"]
mod parameters_spec;
