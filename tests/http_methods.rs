//! Live conformance suite: method rejection and connection handling
//!
//! A single pipelined raw payload probes both the rejection status and
//! whether the server closes the connection afterwards.

mod common;

use ukaguzi::{ConfigTemplate, RawExpect, Step, TestCase};

const CONFIG: &str = "\
events {}
http {
    server {
        listen       %%default-port%%;
        server_name  localhost;
        location / {
            return      200;
        }
        %%test-info%%
    }
}
";

#[tokio::test]
async fn rejected_method_closes_the_connection() {
    common::init_logging();
    let Some(settings) = common::suite::live_settings() else {
        return;
    };

    let payload = "TRACE / HTTP/1.1\r\nHost: localhost\r\n\r\n\
                   GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";

    let case = TestCase::new("HttpMethods", ConfigTemplate::new(CONFIG)).step(Step::raw(
        payload,
        vec![
            RawExpect::contains("HTTP/1.1 405"),
            RawExpect::contains("Connection: close"),
        ],
    ));

    case.run(&settings).await.expect("method-rejection conformance");
}
