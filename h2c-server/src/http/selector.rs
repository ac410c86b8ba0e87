use serde_json::Value;

use crate::error::FacadeError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Eq,
    NotEq,
}

#[derive(Debug, Clone)]
struct Term {
    key: String,
    op: Op,
    value: String,
}

/// A parsed `labelSelector` query value: equality, inequality, and
/// comma-separated conjunction only (spec §4.6, GLOSSARY).
#[derive(Debug, Clone, Default)]
pub struct Selector {
    terms: Vec<Term>,
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, FacadeError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut terms = Vec::new();
        for clause in raw.split(',') {
            let clause = clause.trim();
            if clause.is_empty() {
                return Err(FacadeError::bad_request(format!(
                    "empty selector clause in '{raw}'"
                )));
            }

            let (key, op, value) = if let Some((k, v)) = clause.split_once("!=") {
                (k, Op::NotEq, v)
            } else if let Some((k, v)) = clause.split_once("==") {
                (k, Op::Eq, v)
            } else if let Some((k, v)) = clause.split_once('=') {
                (k, Op::Eq, v)
            } else {
                return Err(FacadeError::bad_request(format!(
                    "unsupported selector operator in '{clause}'"
                )));
            };

            terms.push(Term {
                key: key.trim().to_string(),
                op,
                value: value.trim().to_string(),
            });
        }

        Ok(Self { terms })
    }

    pub fn matches(&self, labels: &Value) -> bool {
        self.terms.iter().all(|term| {
            let actual = labels.get(&term.key).and_then(Value::as_str);
            match term.op {
                Op::Eq => actual == Some(term.value.as_str()),
                Op::NotEq => actual != Some(term.value.as_str()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_selector_matches_everything() {
        let selector = Selector::parse("").unwrap();
        assert!(selector.matches(&json!({"app": "web"})));
    }

    #[test]
    fn equality_selector_filters() {
        let selector = Selector::parse("tier=frontend").unwrap();
        assert!(selector.matches(&json!({"tier": "frontend"})));
        assert!(!selector.matches(&json!({"tier": "backend"})));
    }

    #[test]
    fn double_equals_behaves_like_single() {
        let selector = Selector::parse("tier==frontend").unwrap();
        assert!(selector.matches(&json!({"tier": "frontend"})));
    }

    #[test]
    fn inequality_selector_filters() {
        let selector = Selector::parse("tier!=backend").unwrap();
        assert!(selector.matches(&json!({"tier": "frontend"})));
        assert!(!selector.matches(&json!({"tier": "backend"})));
    }

    #[test]
    fn comma_conjunction_requires_all_terms() {
        let selector = Selector::parse("tier=frontend,app=web").unwrap();
        assert!(selector.matches(&json!({"tier": "frontend", "app": "web"})));
        assert!(!selector.matches(&json!({"tier": "frontend", "app": "db"})));
    }

    #[test]
    fn unknown_operator_is_bad_request() {
        let err = Selector::parse("tier~frontend").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
