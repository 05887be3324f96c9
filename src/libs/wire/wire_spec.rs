extern crate hamcrest2;

#[cfg(test)]
mod wire_spec {
    use hamcrest2::prelude::*;
    use serde_json::{json, Value};
    use crate::libs::double_triple::double_triple::encode;
    use crate::libs::matchers::parameter_matchers::has_parameter;
    use crate::libs::parameters::parameters::{ParameterSet, ParameterValue};
    use crate::libs::sync_error::sync_error::SyncError;
    use crate::libs::wire::wire::{decode_inbound, decode_status, encode_outbound, WireFormat};

    #[ctor::ctor]
    fn before_each() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[ctor::dtor]
    fn after_each() {}

    fn as_json(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn datasets_expand_floats_into_triples() {
        let mut params = ParameterSet::new();
        params.insert("tx_car_osc_qrg_f", 1000.0);
        params.insert("osc1_modtyp_s", 2);
        let body = as_json(&encode_outbound(&params, false, WireFormat::Datasets).unwrap());
        let flat = &body["datasets"]["params"];
        let triple = encode(1000.0).unwrap();
        assert_that!(flat["SE_tx_car_osc_qrg_f"].clone(), equal_to(json!(triple.se)));
        assert_that!(flat["HI_tx_car_osc_qrg_f"].clone(), equal_to(json!(triple.hi)));
        assert_that!(flat["LO_tx_car_osc_qrg_f"].clone(), equal_to(json!(triple.lo)));
        assert_that!(flat.get("tx_car_osc_qrg_f").is_none(), equal_to(true));
        assert_that!(flat["osc1_modtyp_s"].as_f64(), equal_to(Some(2.0)));
    }

    #[test]
    fn full_state_request_adds_the_command_marker() {
        let body = as_json(&encode_outbound(&ParameterSet::new(), true, WireFormat::Datasets).unwrap());
        assert_that!(body["datasets"]["params"]["in_command"].clone(), equal_to(json!("send_all_params")));
    }

    #[test]
    fn legacy_wraps_values_and_leaves_floats_alone() {
        let mut params = ParameterSet::new();
        params.insert("tx_car_osc_qrg_f", 7.5);
        params.insert("rb_run", true);
        let body = as_json(&encode_outbound(&params, true, WireFormat::Legacy).unwrap());
        assert_that!(body["parameters"]["tx_car_osc_qrg_f"].clone(), equal_to(json!({ "value": 7.5 })));
        assert_that!(body["parameters"]["rb_run"].clone(), equal_to(json!({ "value": true })));
        assert_that!(body["parameters"]["in_command"].clone(), equal_to(json!({ "value": "send_all_params" })));
    }

    #[test]
    fn unsupported_floats_are_refused_before_sending() {
        let mut params = ParameterSet::new();
        params.insert("rx_car_osc_qrg_f", f64::NAN);
        let result = encode_outbound(&params, false, WireFormat::Datasets);
        assert_that!(result.is_err(), equal_to(true));
    }

    #[test]
    fn datasets_triples_are_reassembled() {
        let triple = encode(-14.0625).unwrap();
        let body = json!({ "datasets": { "params": {
            "SE_rx_car_osc_qrg_f": triple.se, "HI_rx_car_osc_qrg_f": triple.hi, "LO_rx_car_osc_qrg_f": triple.lo,
            "rb_add_res_i": 30,
            "rb_run": true,
        }, "signals": { "ch1": { "size": 2, "value": [0.5, 0.25] } } } });
        let message = decode_inbound(&body.to_string(), WireFormat::Datasets).unwrap();
        let params = message.params.unwrap();
        assert_that!(&params, has_parameter("rx_car_osc_qrg_f", ParameterValue::Number(-14.0625)));
        assert_that!(&params, has_parameter("rb_add_res_i", ParameterValue::Number(30.0)));
        assert_that!(&params, has_parameter("rb_run", ParameterValue::Flag(true)));
        assert_that!(params.len(), equal_to(3));
        assert_that!(message.send_all_params, equal_to(false));
        assert_that!(message.signals.unwrap().0["ch1"]["size"].as_u64(), equal_to(Some(2)));
    }

    #[test]
    fn marker_key_is_detected_and_not_stored() {
        let body = json!({ "datasets": { "params": { "send_all_params": 1, "osc1_qrg_i": 5 } } });
        let message = decode_inbound(&body.to_string(), WireFormat::Datasets).unwrap();
        assert_that!(message.send_all_params, equal_to(true));
        assert_that!(message.params.unwrap().keys(), equal_to(vec!["osc1_qrg_i".to_string()]));
    }

    #[test]
    fn legacy_parameters_are_unwrapped() {
        let body = json!({ "parameters": { "osc1_qrg_i": { "value": 3 }, "in_command": { "value": "send_all_params" } } });
        let message = decode_inbound(&body.to_string(), WireFormat::Legacy).unwrap();
        assert_that!(message.send_all_params, equal_to(true));
        assert_that!(&message.params.unwrap(), has_parameter("osc1_qrg_i", ParameterValue::Number(3.0)));
    }

    #[test]
    fn error_status_is_an_application_error() {
        let body = json!({ "status": "ERROR", "reason": "Application not loaded" });
        let result = decode_inbound(&body.to_string(), WireFormat::Datasets);
        assert_that!(result, equal_to(Err(SyncError::ApplicationError(Some("Application not loaded".to_string())))));
    }

    #[test]
    fn unknown_structure_is_malformed() {
        match decode_inbound(r#"{"hello": "world"}"#, WireFormat::Datasets) {
            Err(SyncError::MalformedResponse(_)) => {}
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
        match decode_inbound("<html>502</html>", WireFormat::Legacy) {
            Err(SyncError::MalformedResponse(_)) => {}
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn incomplete_triples_are_malformed() {
        let body = json!({ "datasets": { "params": { "SE_tx_amp_rf_gain_f": 1023, "HI_tx_amp_rf_gain_f": 0 } } });
        match decode_inbound(&body.to_string(), WireFormat::Datasets) {
            Err(SyncError::MalformedResponse(_)) => {}
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
        let orphan = json!({ "datasets": { "params": { "LO_tx_amp_rf_gain_f": 0 } } });
        match decode_inbound(&orphan.to_string(), WireFormat::Datasets) {
            Err(SyncError::MalformedResponse(_)) => {}
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn prefixed_names_outside_a_triple_are_plain_parameters() {
        let body = json!({ "datasets": { "params": { "HI_score_i": 7, "LO_level": 2, "SE_mode_s": 1 } } });
        let params = decode_inbound(&body.to_string(), WireFormat::Datasets).unwrap().params.unwrap();
        assert_that!(&params, has_parameter("HI_score_i", 7.0));
        assert_that!(&params, has_parameter("LO_level", 2.0));
        assert_that!(&params, has_parameter("SE_mode_s", 1.0));
        assert_that!(params.len(), equal_to(3));
    }

    #[test]
    fn status_replies() {
        assert_that!(decode_status(r#"{"status":"OK"}"#), equal_to(Ok(())));
        assert_that!(decode_status(r#"{"status":"ERROR"}"#), equal_to(Err(SyncError::ApplicationError(None))));
        match decode_status(r#"{"status":"MAYBE"}"#) {
            Err(SyncError::MalformedResponse(_)) => {}
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }
}
