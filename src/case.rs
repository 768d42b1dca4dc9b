// src/case.rs
// A test case: one rendered configuration, a sequence of requests, and the
// checks evaluated against what came back

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Method;
use tokio::sync::Mutex;

use crate::client::{CapturedResponse, StructuredClient};
use crate::error::HarnessError;
use crate::fixture::Fixture;
use crate::logger;
use crate::raw::RawClient;
use crate::server::{sentinel_route, ServerController};
use crate::settings::Settings;
use crate::template::{self, Bindings, ConfigTemplate};

// The configuration file and served-content directory are process-wide
// shared state; cases execute strictly one at a time.
fn sut_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Expectation against a structured response.
#[derive(Debug)]
pub enum Expect {
    Status(u16),
    /// Status class, e.g. `2` for any 2xx.
    StatusClass(u16),
    Header(String, String),
    BodyEquals(String),
    BodyContains(String),
    BodyMatches(Regex),
}

impl Expect {
    pub fn header(name: &str, value: &str) -> Self {
        Expect::Header(name.to_string(), value.to_string())
    }

    pub fn body_equals(body: &str) -> Self {
        Expect::BodyEquals(body.to_string())
    }

    pub fn body_contains(fragment: &str) -> Self {
        Expect::BodyContains(fragment.to_string())
    }
}

/// Expectation against raw response text.
#[derive(Debug)]
pub enum RawExpect {
    Contains(String),
    Matches(Regex),
}

impl RawExpect {
    pub fn contains(fragment: &str) -> Self {
        RawExpect::Contains(fragment.to_string())
    }
}

/// One request in a case, with the checks evaluated on its response.
#[derive(Debug)]
pub enum Step {
    Structured {
        method: Method,
        target: String,
        expect: Vec<Expect>,
    },
    /// A literal payload written to the raw transport.
    Raw {
        payload: String,
        expect: Vec<RawExpect>,
    },
    /// A minimal GET request whose target is spliced in without escaping.
    RawGet {
        target: String,
        expect: Vec<RawExpect>,
    },
}

impl Step {
    pub fn get(target: &str, expect: Vec<Expect>) -> Self {
        Step::exchange(Method::GET, target, expect)
    }

    pub fn exchange(method: Method, target: &str, expect: Vec<Expect>) -> Self {
        Step::Structured {
            method,
            target: target.to_string(),
            expect,
        }
    }

    pub fn raw(payload: &str, expect: Vec<RawExpect>) -> Self {
        Step::Raw {
            payload: payload.to_string(),
            expect,
        }
    }

    pub fn raw_get(target: &str, expect: Vec<RawExpect>) -> Self {
        Step::RawGet {
            target: target.to_string(),
            expect,
        }
    }

    fn label(&self) -> String {
        match self {
            Step::Structured { method, target, .. } => format!("{} {}", method, target),
            Step::Raw { payload, .. } => {
                let first_line = payload.lines().next().unwrap_or("");
                format!("raw [{}]", first_line)
            }
            Step::RawGet { target, .. } => format!("raw GET {}", target),
        }
    }
}

#[derive(Debug)]
struct FixturePlan {
    dir: PathBuf,
    files: Vec<(String, String)>,
}

/// Couples a case identifier, a configuration template, staged fixtures and
/// a sequence of request steps.
///
/// `run` serializes on a process-wide lock, renders the configuration with
/// the identifier-bearing sentinel route, stages fixtures, drives the server
/// through its reload-and-confirm cycle, then executes every step. Checks
/// never short-circuit: all failures across the whole case surface together.
#[derive(Debug)]
pub struct TestCase {
    id: String,
    template: ConfigTemplate,
    fixtures: Vec<FixturePlan>,
    steps: Vec<Step>,
}

impl TestCase {
    pub fn new(id: &str, template: ConfigTemplate) -> Self {
        TestCase {
            id: id.to_string(),
            template,
            fixtures: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(mut self, dir: &Path, files: &[(&str, &str)]) -> Self {
        self.fixtures.push(FixturePlan {
            dir: dir.to_path_buf(),
            files: files
                .iter()
                .map(|(name, content)| (name.to_string(), content.to_string()))
                .collect(),
        });
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub async fn run(&self, settings: &Settings) -> Result<(), HarnessError> {
        let _guard = sut_lock().lock().await;
        let reporter = logger::reporter();
        reporter.case_start(&self.id);

        let bindings = Bindings::new()
            .bind(template::DEFAULT_PORT, &settings.port.to_string())
            .bind(template::TEST_INFO, &sentinel_route(&self.id))
            .bind(
                template::TEST_DIR,
                &settings.content_dir().to_string_lossy(),
            );
        let rendered = self.template.render(&bindings)?;

        let mut fixtures = Vec::new();
        for plan in &self.fixtures {
            let files: Vec<(&str, &str)> = plan
                .files
                .iter()
                .map(|(name, content)| (name.as_str(), content.as_str()))
                .collect();
            fixtures.push(Fixture::stage(&plan.dir, &files)?);
        }

        let controller = ServerController::from_settings(settings)?;
        if let Err(e) = controller.apply(&rendered, &self.id).await {
            reporter.warn(&format!("{} setup aborted: {}", self.id, e));
            teardown(&mut fixtures, reporter);
            return Err(e);
        }

        let mut checks = Checks::new();
        let outcome = self.execute_steps(settings, &mut checks).await;

        // Teardown always runs; its errors are logged and never mask the
        // case outcome.
        teardown(&mut fixtures, reporter);
        outcome?;

        let failures = checks.into_failures();
        if failures.is_empty() {
            reporter.case_passed(&self.id, self.steps.len());
            Ok(())
        } else {
            reporter.case_failed(&self.id, &failures);
            Err(HarnessError::ChecksFailed(failures))
        }
    }

    async fn execute_steps(
        &self,
        settings: &Settings,
        checks: &mut Checks,
    ) -> Result<(), HarnessError> {
        let structured = StructuredClient::new(&settings.base_url())?;
        let raw = RawClient::new(&settings.host);
        let reporter = logger::reporter();

        for step in &self.steps {
            reporter.step(&self.id, &step.label());
            match step {
                Step::Structured {
                    method,
                    target,
                    expect,
                } => {
                    let response = structured.exchange(method.clone(), target).await?;
                    evaluate_structured(&step.label(), expect, &response, checks);
                }
                Step::Raw { payload, expect } => {
                    let text = raw.send(settings.port, payload).await?;
                    evaluate_raw(&step.label(), expect, &text, checks);
                }
                Step::RawGet { target, expect } => {
                    let payload = RawClient::get_request(target, &settings.host, settings.port);
                    let text = raw.send(settings.port, &payload).await?;
                    evaluate_raw(&step.label(), expect, &text, checks);
                }
            }
        }

        Ok(())
    }
}

fn teardown(fixtures: &mut Vec<Fixture>, reporter: &logger::Reporter) {
    for fixture in fixtures.iter_mut() {
        if let Err(e) = fixture.restore() {
            reporter.warn(&format!("fixture teardown: {}", e));
        }
    }
    fixtures.clear();
}

fn evaluate_structured(
    label: &str,
    expects: &[Expect],
    response: &CapturedResponse,
    checks: &mut Checks,
) {
    for expect in expects {
        match expect {
            Expect::Status(code) => {
                checks.check_eq(&format!("{}: status", label), code, &response.status);
            }
            Expect::StatusClass(class) => checks.check(
                response.status / 100 == *class,
                &format!(
                    "{}: status {} should be {}xx",
                    label, response.status, class
                ),
            ),
            Expect::Header(name, value) => {
                let actual = response.header_first(name);
                checks.check(
                    actual == Some(value.as_str()),
                    &format!(
                        "{}: header {} is {:?}, expected {:?}",
                        label, name, actual, value
                    ),
                );
            }
            Expect::BodyEquals(body) => {
                checks.check_eq(&format!("{}: body", label), body, &response.body);
            }
            Expect::BodyContains(fragment) => checks.check(
                response.body.contains(fragment),
                &format!("{}: body should contain {:?}", label, fragment),
            ),
            Expect::BodyMatches(pattern) => checks.check(
                pattern.is_match(&response.body),
                &format!("{}: body should match /{}/", label, pattern),
            ),
        }
    }
}

fn evaluate_raw(label: &str, expects: &[RawExpect], text: &str, checks: &mut Checks) {
    for expect in expects {
        match expect {
            RawExpect::Contains(fragment) => checks.check(
                text.contains(fragment),
                &format!("{}: response should contain {:?}", label, fragment),
            ),
            RawExpect::Matches(pattern) => checks.check(
                pattern.is_match(text),
                &format!("{}: response should match /{}/", label, pattern),
            ),
        }
    }
}

/// Non-short-circuiting check collector: every check in a case is evaluated
/// and all failures surface together.
#[derive(Debug, Default)]
pub struct Checks {
    failures: Vec<String>,
}

impl Checks {
    pub fn new() -> Self {
        Checks {
            failures: Vec::new(),
        }
    }

    pub fn check(&mut self, condition: bool, label: &str) {
        if !condition {
            self.failures.push(label.to_string());
        }
    }

    pub fn check_eq<T: PartialEq + Debug>(&mut self, label: &str, expected: &T, actual: &T) {
        if expected != actual {
            self.failures
                .push(format!("{}: expected {:?}, got {:?}", label, expected, actual));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failures
    }

    pub fn finish(self) -> Result<(), HarnessError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::ChecksFailed(self.failures))
        }
    }
}
