use std::fmt::{Display, Formatter};
use std::fmt;

use log::{debug, warn};
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::{json, Map, Value};

use crate::libs::double_triple::double_triple::{decode, encode, DoubleTriple};
use crate::libs::parameters::parameters::{kind_of, ParameterKind, ParameterSet, ParameterValue};
use crate::libs::sync_error::sync_error::SyncError;

pub const SEND_ALL_PARAMS: &str = "send_all_params";
pub const IN_COMMAND: &str = "in_command";

const SE_PREFIX: &str = "SE_";
const HI_PREFIX: &str = "HI_";
const LO_PREFIX: &str = "LO_";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum WireFormat {
    // { parameters: { key: { value: v } } }
    Legacy,
    // { datasets: { params: { key: v } } }, floats as SE_/HI_/LO_ triples
    Datasets,
}

impl Display for WireFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// Named sample arrays. Never interpreted here, only handed on to whoever renders them.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet(pub Value);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InboundMessage {
    pub params: Option<ParameterSet>,
    pub signals: Option<SignalSet>,
    pub send_all_params: bool,
}

impl InboundMessage {
    pub fn with_params(params: ParameterSet) -> InboundMessage {
        InboundMessage { params: Some(params), signals: None, send_all_params: false }
    }
}

pub fn encode_outbound(params: &ParameterSet, request_full_state: bool, format: WireFormat) -> Result<String, SyncError> {
    let body = match format {
        WireFormat::Legacy => {
            let mut wrapped = Map::new();
            for (key, value) in params {
                wrapped.insert(key.clone(), json!({ "value": value }));
            }
            if request_full_state {
                wrapped.insert(IN_COMMAND.to_string(), json!({ "value": SEND_ALL_PARAMS }));
            }
            json!({ "parameters": wrapped })
        }
        WireFormat::Datasets => {
            let mut flat = Map::new();
            for (key, value) in params {
                match (kind_of(key), value) {
                    (ParameterKind::Float, ParameterValue::Number(n)) => {
                        let triple = encode(*n)?;
                        flat.insert(format!("{}{}", SE_PREFIX, key), json!(triple.se));
                        flat.insert(format!("{}{}", HI_PREFIX, key), json!(triple.hi));
                        flat.insert(format!("{}{}", LO_PREFIX, key), json!(triple.lo));
                    }
                    _ => {
                        flat.insert(key.clone(), json!(value));
                    }
                }
            }
            if request_full_state {
                flat.insert(IN_COMMAND.to_string(), json!(SEND_ALL_PARAMS));
            }
            json!({ "datasets": { "params": flat } })
        }
    };
    let text = body.to_string();
    debug!("Outbound {} message: {}", format, text);
    Ok(text)
}

pub fn decode_inbound(body: &str, format: WireFormat) -> Result<InboundMessage, SyncError> {
    let root = parse(body)?;
    let (params, signals) = match format {
        WireFormat::Legacy => (root.get("parameters"), root.get("signals")),
        WireFormat::Datasets => match root.get("datasets") {
            Some(datasets) => (datasets.get("params"), datasets.get("signals")),
            None => return Err(status_error(&root)),
        },
    };
    if format == WireFormat::Legacy && params.is_none() && signals.is_none() {
        return Err(status_error(&root));
    }

    let mut message = InboundMessage::default();
    if let Some(params) = params {
        let object = params.as_object()
            .ok_or_else(|| SyncError::MalformedResponse("parameters are not an object".to_string()))?;
        let (decoded, marker) = match format {
            WireFormat::Legacy => decode_legacy_params(object)?,
            WireFormat::Datasets => decode_dataset_params(object)?,
        };
        message.params = Some(decoded);
        message.send_all_params = marker;
    }
    if let Some(signals) = signals {
        message.signals = Some(SignalSet(signals.clone()));
    }
    Ok(message)
}

// Replies to the start/stop requests only carry a status.
pub fn decode_status(body: &str) -> Result<(), SyncError> {
    let root = parse(body)?;
    match root.get("status").and_then(Value::as_str) {
        Some("OK") => Ok(()),
        _ => Err(status_error(&root)),
    }
}

fn parse(body: &str) -> Result<Value, SyncError> {
    serde_json::from_str(body).map_err(|e| SyncError::MalformedResponse(format!("not JSON: {}", e)))
}

fn status_error(root: &Value) -> SyncError {
    match root.get("status").and_then(Value::as_str) {
        Some("ERROR") => {
            let reason = root.get("reason").and_then(Value::as_str).map(str::to_string);
            SyncError::ApplicationError(reason)
        }
        _ => SyncError::MalformedResponse("missing datasets and status".to_string()),
    }
}

fn is_marker(key: &str, value: &Value) -> bool {
    key == SEND_ALL_PARAMS || (key == IN_COMMAND && value.as_str() == Some(SEND_ALL_PARAMS))
}

fn to_value(key: &str, value: &Value) -> Result<ParameterValue, SyncError> {
    serde_json::from_value(value.clone())
        .map_err(|_| SyncError::MalformedResponse(format!("unsupported value for '{}': {}", key, value)))
}

fn decode_legacy_params(object: &Map<String, Value>) -> Result<(ParameterSet, bool), SyncError> {
    let mut decoded = ParameterSet::new();
    let mut marker = false;
    for (key, wrapped) in object {
        let value = wrapped.get("value")
            .ok_or_else(|| SyncError::MalformedResponse(format!("'{}' has no value", key)))?;
        if is_marker(key, value) {
            marker = true;
            continue;
        }
        decoded.insert(key, to_value(key, value)?);
    }
    Ok((decoded, marker))
}

fn decode_dataset_params(object: &Map<String, Value>) -> Result<(ParameterSet, bool), SyncError> {
    let mut decoded = ParameterSet::new();
    let mut marker = false;
    for (key, value) in object {
        if is_marker(key, value) {
            marker = true;
            continue;
        }
        match triple_component(object, key) {
            Some((SE_PREFIX, name)) => {
                let triple = DoubleTriple::new(
                    triple_field(object, SE_PREFIX, name)?,
                    triple_field(object, HI_PREFIX, name)?,
                    triple_field(object, LO_PREFIX, name)?);
                decoded.insert(name, decode(&triple));
            }
            Some((_, name)) => {
                if !object.contains_key(&format!("{}{}", SE_PREFIX, name)) {
                    warn!("Triple component {} arrived without SE_{}", key, name);
                    return Err(SyncError::MalformedResponse(format!("incomplete triple for '{}'", name)));
                }
            }
            None => {
                decoded.insert(key, to_value(key, value)?);
            }
        }
    }
    Ok((decoded, marker))
}

// A prefixed key is part of a triple only if it names a float, or another component of the same
// triple is present; otherwise it is an ordinary parameter that happens to start with SE_/HI_/LO_.
fn triple_component<'a>(object: &Map<String, Value>, key: &'a str) -> Option<(&'static str, &'a str)> {
    let (prefix, name) = [SE_PREFIX, HI_PREFIX, LO_PREFIX].iter()
        .find_map(|prefix| key.strip_prefix(prefix).map(|name| (*prefix, name)))?;
    let has_sibling = [SE_PREFIX, HI_PREFIX, LO_PREFIX].iter()
        .any(|other| *other != prefix && object.contains_key(&format!("{}{}", other, name)));
    if kind_of(name) == ParameterKind::Float || has_sibling {
        Some((prefix, name))
    } else {
        None
    }
}

fn triple_field(object: &Map<String, Value>, prefix: &str, name: &str) -> Result<u32, SyncError> {
    let field = format!("{}{}", prefix, name);
    let number = object.get(&field).and_then(Value::as_f64)
        .ok_or_else(|| SyncError::MalformedResponse(format!("incomplete triple for '{}': no {}", name, field)))?;
    if number < 0.0 || number.fract() != 0.0 || number > u32::MAX as f64 {
        return Err(SyncError::MalformedResponse(format!("{} is not a triple field: {}", field, number)));
    }
    Ok(number as u32)
}

#[cfg(test)]
#[path = "./wire_spec.rs"]
mod wire_spec;
