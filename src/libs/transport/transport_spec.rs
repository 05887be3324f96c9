extern crate hamcrest2;

#[cfg(test)]
mod transport_spec {
    use std::time::Duration;
    use hamcrest2::prelude::*;
    use crate::libs::sync_error::sync_error::SyncError;
    use crate::libs::transport::transport::{HttpTransport, Transport, TransportConfig};

    #[ctor::ctor]
    fn before_each() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[ctor::dtor]
    fn after_each() {}

    fn config(base_url: &str) -> TransportConfig {
        TransportConfig {
            base_url: base_url.to_string(),
            app_id: "radiobox".to_string(),
            request_timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn urls_follow_the_bazaar_layout() {
        let config = config("http://192.168.1.100/");
        assert_that!(config.start_app_url(), equal_to("http://192.168.1.100/bazaar?start=radiobox".to_string()));
        assert_that!(config.stop_app_url(), equal_to("http://192.168.1.100/bazaar?stop=radiobox".to_string()));
        assert_that!(config.post_url(), equal_to("http://192.168.1.100/data".to_string()));
    }

    #[test]
    fn refused_connection_is_unreachable() {
        // Nothing listens on the discard port.
        let mut transport = HttpTransport::new(config("http://127.0.0.1:9")).unwrap();
        match transport.post("{}") {
            Err(SyncError::TransportUnreachable(_)) => {}
            other => panic!("expected TransportUnreachable, got {:?}", other),
        }
       }
}
