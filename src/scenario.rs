//! Data-driven validation scenarios: one or more declarations, each with a
//! list of inputs and the messages they are expected to produce. An empty
//! `expected` list means the input must validate.
use serde::Deserialize;
use serde_json::Value;

use crate::declaration::{Declaration, DeclarationError, from_str_with_path};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub contexts: Vec<Context>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Context {
    pub name: String,
    pub declaration: Declaration,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub name: String,
    pub input: Value,
    #[serde(default)]
    pub expected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub context: String,
    pub case: String,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

impl Scenario {
    pub fn parse(src: &str) -> Result<Self, DeclarationError> { from_str_with_path(src) }

    /// Compile every context and run its cases, in file order.
    pub fn run(&self) -> Result<Vec<CaseOutcome>, DeclarationError> {
        let mut outcomes = Vec::new();
        for context in &self.contexts {
            let schema = context.declaration.compile()?;
            for case in &context.cases {
                let report = schema.call(&case.input);
                outcomes.push(CaseOutcome {
                    context: context.name.clone(),
                    case: case.name.clone(),
                    expected: case.expected.clone(),
                    actual: report.messages().into_iter().map(str::to_string).collect(),
                });
            }
        }
        tracing::debug!(scenario = %self.name, cases = outcomes.len(), "ran scenario");
        Ok(outcomes)
    }
}

impl CaseOutcome {
    pub fn passed(&self) -> bool { self.expected == self.actual }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::even(include_str!("../fixtures/even.json"))]
    #[case::includes(include_str!("../fixtures/includes.json"))]
    fn fixture_scenarios_hold(#[case] src: &str) {
        let scenario = Scenario::parse(src).unwrap();
        let outcomes = scenario.run().unwrap();
        assert!(!outcomes.is_empty());
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.passed()).collect();
        assert!(failed.is_empty(), "{}: {failed:#?}", scenario.name);
    }

    #[test]
    fn mismatches_are_reported_not_raised() {
        let src = r#"{
            "name": "demo",
            "contexts": [{
                "name": "required value",
                "declaration": { "keys": [{ "name": "foo", "macros": [{ "value": { "type": "integer" } }] }] },
                "cases": [{ "name": "wrong expectation", "input": { "foo": "x" } }]
            }]
        }"#;
        let outcomes = Scenario::parse(src).unwrap().run().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].passed());
        assert_eq!(outcomes[0].actual, vec!["must be an integer"]);
    }
}
