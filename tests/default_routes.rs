//! Live conformance suite: default server block behavior
//!
//! Runs against a real server installation (see `common::suite`); skips
//! when none is configured.

mod common;

use ukaguzi::{ConfigTemplate, Expect, Method, Step, TestCase};

const CONFIG: &str = "\
events {}
http {
    server {
        listen       %%default-port%%;
        server_name  localhost;
        location / { }
        %%test-info%%
    }
}
";

#[tokio::test]
async fn default_location_serves_welcome_and_rejects_the_rest() {
    common::init_logging();
    let Some(settings) = common::suite::live_settings() else {
        return;
    };

    let case = TestCase::new("DefaultRoutes", ConfigTemplate::new(CONFIG))
        .step(Step::get(
            "/",
            vec![Expect::StatusClass(2), Expect::body_contains("Welcome")],
        ))
        .step(Step::exchange(Method::POST, "/", vec![Expect::Status(405)]))
        .step(Step::get("/test", vec![Expect::Status(404)]));

    case.run(&settings).await.expect("default-route conformance");
}
