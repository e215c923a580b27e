#![allow(dead_code)]

use std::path::PathBuf;

use testagent::package::{PackageSettings, SettingValue, TestPackage, settings};
use testagent::results::ResultNode;

/// Builder for `TestPackage` to simplify test setup.
pub struct TestPackageBuilder {
    full_name: PathBuf,
    settings: Vec<(String, SettingValue)>,
}

impl TestPackageBuilder {
    pub fn new(full_name: impl Into<PathBuf>) -> Self {
        Self {
            full_name: full_name.into(),
            settings: Vec::new(),
        }
    }

    pub fn with_setting(mut self, name: &str, value: impl Into<SettingValue>) -> Self {
        self.settings.push((name.to_string(), value.into()));
        self
    }

    pub fn runtime(self, framework: &str) -> Self {
        self.with_setting(settings::TARGET_RUNTIME_FRAMEWORK, framework)
    }

    pub fn trace_level(self, level: &str) -> Self {
        self.with_setting(settings::INTERNAL_TRACE_LEVEL, level)
    }

    pub fn debug_agent(self, on: bool) -> Self {
        self.with_setting(settings::DEBUG_AGENT, on)
    }

    pub fn work_directory(self, dir: &str) -> Self {
        self.with_setting(settings::WORK_DIRECTORY, dir)
    }

    pub fn build(self) -> TestPackage {
        let settings: PackageSettings = self.settings.into_iter().collect();
        TestPackage::with_settings(self.full_name, settings)
    }
}

/// Builder for a result tree root carrying run counters.
pub struct ResultNodeBuilder {
    result: String,
    passed: u32,
    failed: u32,
    warnings: u32,
    inconclusive: u32,
    skipped: u32,
    cases: Vec<ResultNode>,
}

impl ResultNodeBuilder {
    pub fn new(result: &str) -> Self {
        Self {
            result: result.to_string(),
            passed: 0,
            failed: 0,
            warnings: 0,
            inconclusive: 0,
            skipped: 0,
            cases: Vec::new(),
        }
    }

    /// Counts in the order the summary line prints them.
    pub fn counts(
        mut self,
        passed: u32,
        failed: u32,
        warnings: u32,
        inconclusive: u32,
        skipped: u32,
    ) -> Self {
        self.passed = passed;
        self.failed = failed;
        self.warnings = warnings;
        self.inconclusive = inconclusive;
        self.skipped = skipped;
        self
    }

    pub fn with_case(mut self, name: &str, result: &str) -> Self {
        self.cases.push(
            ResultNode::new("test-case")
                .with_attribute("fullname", name)
                .with_attribute("result", result),
        );
        self
    }

    pub fn build(self) -> ResultNode {
        let total =
            self.passed + self.failed + self.warnings + self.inconclusive + self.skipped;
        let mut root = ResultNode::new("test-run")
            .with_attribute("result", &self.result)
            .with_attribute("testcasecount", total)
            .with_attribute("passed", self.passed)
            .with_attribute("failed", self.failed)
            .with_attribute("warnings", self.warnings)
            .with_attribute("inconclusive", self.inconclusive)
            .with_attribute("skipped", self.skipped);
        for case in self.cases {
            root = root.with_child(case);
        }
        root
    }
}
