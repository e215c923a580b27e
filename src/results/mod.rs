// src/results/mod.rs

//! Structured test results.
//!
//! The execution engine hands back a [`ResultNode`] tree. The agent only
//! looks at a handful of summary attributes on the root ([`ResultSummary`]);
//! everything else is carried through untouched into the result document.
//!
//! - [`xml`] converts trees to and from indented XML.
//! - [`writer`] persists a tree as `TestResult.xml`, all or nothing.

use crate::errors::{AgentError, Result};

pub mod writer;
pub mod xml;

pub use writer::{RESULT_FILE_NAME, write_result_file};
pub use xml::{parse_result_xml, to_xml_string};

/// One element of a result tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultNode {
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<ResultNode>,
}

impl ResultNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: ResultNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an existing attribute in place, or append a new one.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name, value)),
        }
    }
}

/// Root-level counters of a test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub result: String,
    pub test_cases: u32,
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
    pub inconclusive: u32,
    pub skipped: u32,
}

impl ResultSummary {
    /// Read the summary attributes from a result tree's root.
    pub fn from_node(node: &ResultNode) -> Result<Self> {
        let result = node
            .attribute("result")
            .ok_or_else(|| missing(node, "result"))?
            .to_string();

        Ok(Self {
            result,
            test_cases: count(node, "testcasecount")?,
            passed: count(node, "passed")?,
            failed: count(node, "failed")?,
            warnings: count(node, "warnings")?,
            inconclusive: count(node, "inconclusive")?,
            skipped: count(node, "skipped")?,
        })
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Cases: {}, Passed: {}, Failed: {}, Warnings: {}, Inconclusive: {}, Skipped: {}",
            self.test_cases, self.passed, self.failed, self.warnings, self.inconclusive, self.skipped
        )
    }
}

fn count(node: &ResultNode, name: &str) -> Result<u32> {
    let raw = node.attribute(name).ok_or_else(|| missing(node, name))?;
    raw.trim().parse().map_err(|_| {
        AgentError::ResultError(format!(
            "attribute '{name}' on <{}> is not a count: {raw:?}",
            node.name
        ))
    })
}

fn missing(node: &ResultNode, name: &str) -> AgentError {
    AgentError::ResultError(format!(
        "result root <{}> has no '{name}' attribute",
        node.name
    ))
}
