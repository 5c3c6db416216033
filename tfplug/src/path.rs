//! Path expressions
//!
//! A `PathExpression` describes one or more attribute paths, possibly
//! relative to the attribute being validated and possibly with wildcards.
//! Expressions are matched against a configuration tree to produce the
//! concrete `AttributePath`s they refer to.

use crate::types::{AttributePath, AttributePathStep, Dynamic};
use std::fmt;

/// A single step of a path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionStep {
    AttributeName(String),
    /// Step back to the enclosing attribute or element
    Parent,
    AnyListIndex,
    ListIndex(i64),
    AnyMapKey,
    MapKey(String),
}

impl fmt::Display for ExpressionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionStep::AttributeName(name) => write!(f, "{}", name),
            ExpressionStep::Parent => write!(f, "<"),
            ExpressionStep::AnyListIndex => write!(f, "[*]"),
            ExpressionStep::ListIndex(idx) => write!(f, "[{}]", idx),
            ExpressionStep::AnyMapKey => write!(f, "[\"*\"]"),
            ExpressionStep::MapKey(key) => write!(f, "[{:?}]", key),
        }
    }
}

/// Expression over attribute paths.
///
/// `root` expressions start at the top of the configuration. Relative
/// expressions only mean something once merged onto the expression of the
/// attribute under validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    pub steps: Vec<ExpressionStep>,
    pub root: bool,
}

impl PathExpression {
    /// Absolute expression starting at a top-level attribute
    pub fn match_root(name: &str) -> Self {
        Self {
            steps: vec![ExpressionStep::AttributeName(name.to_string())],
            root: true,
        }
    }

    /// Empty relative expression, extended with the `at_*` builders
    pub fn match_relative() -> Self {
        Self {
            steps: Vec::new(),
            root: false,
        }
    }

    /// Absolute expression matching exactly `path`
    pub fn from_path(path: &AttributePath) -> Self {
        let steps = path
            .steps
            .iter()
            .map(|step| match step {
                AttributePathStep::AttributeName(name) => ExpressionStep::AttributeName(name.clone()),
                AttributePathStep::ElementKeyString(key) => ExpressionStep::MapKey(key.clone()),
                AttributePathStep::ElementKeyInt(idx) => ExpressionStep::ListIndex(*idx),
            })
            .collect();
        Self { steps, root: true }
    }

    pub fn at_name(mut self, name: &str) -> Self {
        self.steps
            .push(ExpressionStep::AttributeName(name.to_string()));
        self
    }

    pub fn at_parent(mut self) -> Self {
        self.steps.push(ExpressionStep::Parent);
        self
    }

    pub fn at_any_list_index(mut self) -> Self {
        self.steps.push(ExpressionStep::AnyListIndex);
        self
    }

    pub fn at_list_index(mut self, idx: i64) -> Self {
        self.steps.push(ExpressionStep::ListIndex(idx));
        self
    }

    pub fn at_any_map_key(mut self) -> Self {
        self.steps.push(ExpressionStep::AnyMapKey);
        self
    }

    pub fn at_map_key(mut self, key: &str) -> Self {
        self.steps.push(ExpressionStep::MapKey(key.to_string()));
        self
    }

    /// Combines `other` with this expression. Absolute expressions are
    /// returned unchanged; relative ones are appended.
    pub fn merge(&self, other: &PathExpression) -> PathExpression {
        if other.root {
            return other.clone();
        }
        let mut steps = self.steps.clone();
        steps.extend(other.steps.iter().cloned());
        PathExpression {
            steps,
            root: self.root,
        }
    }

    /// Merges each of `others` with this expression
    pub fn merge_expressions(&self, others: &[PathExpression]) -> Vec<PathExpression> {
        others.iter().map(|other| self.merge(other)).collect()
    }

    /// Collapses parent steps. A parent step removes the step before it; a
    /// parent step with nothing before it is dropped.
    pub fn resolve(&self) -> PathExpression {
        let mut steps: Vec<ExpressionStep> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match step {
                ExpressionStep::Parent => {
                    steps.pop();
                }
                other => steps.push(other.clone()),
            }
        }
        PathExpression {
            steps,
            root: self.root,
        }
    }

    /// Every concrete path in `config` matched by this expression.
    ///
    /// A final attribute-name step always matches on an object even when the
    /// attribute is absent, so such attributes read back as null. Wildcards
    /// and intermediate steps never descend through null or unknown values.
    pub fn matches(&self, config: &Dynamic) -> Vec<AttributePath> {
        let resolved = self.resolve();
        let mut found = Vec::new();
        walk(config, &resolved.steps, AttributePath::root(), &mut found);
        found
    }

    /// True when the concrete `path` is matched by this expression
    pub fn matches_path(&self, path: &AttributePath) -> bool {
        let resolved = self.resolve();
        if resolved.steps.len() != path.steps.len() {
            return false;
        }
        resolved
            .steps
            .iter()
            .zip(&path.steps)
            .all(|(expr, step)| match (expr, step) {
                (ExpressionStep::AttributeName(a), AttributePathStep::AttributeName(b)) => a == b,
                (ExpressionStep::AnyListIndex, AttributePathStep::ElementKeyInt(_)) => true,
                (ExpressionStep::ListIndex(a), AttributePathStep::ElementKeyInt(b)) => a == b,
                (ExpressionStep::AnyMapKey, AttributePathStep::ElementKeyString(_)) => true,
                (ExpressionStep::MapKey(a), AttributePathStep::ElementKeyString(b)) => a == b,
                _ => false,
            })
    }
}

fn walk(
    value: &Dynamic,
    steps: &[ExpressionStep],
    at: AttributePath,
    found: &mut Vec<AttributePath>,
) {
    let Some((step, rest)) = steps.split_first() else {
        found.push(at);
        return;
    };

    match (step, value) {
        (ExpressionStep::AttributeName(name), Dynamic::Map(m)) => match m.get(name) {
            Some(child) => walk(child, rest, at.attribute(name), found),
            None if rest.is_empty() => found.push(at.attribute(name)),
            None => {}
        },
        (ExpressionStep::AttributeName(name), Dynamic::Null | Dynamic::Unknown)
            if rest.is_empty() =>
        {
            found.push(at.attribute(name))
        }
        (ExpressionStep::AnyListIndex, Dynamic::List(items)) => {
            for (idx, item) in items.iter().enumerate() {
                walk(item, rest, at.clone().index(idx as i64), found);
            }
        }
        (ExpressionStep::ListIndex(idx), Dynamic::List(items)) => {
            if let Some(item) = usize::try_from(*idx).ok().and_then(|i| items.get(i)) {
                walk(item, rest, at.index(*idx), found);
            }
        }
        (ExpressionStep::AnyMapKey, Dynamic::Map(m)) => {
            let mut keys: Vec<&String> = m.keys().collect();
            keys.sort();
            for key in keys {
                walk(&m[key], rest, at.clone().key(key), found);
            }
        }
        (ExpressionStep::MapKey(key), Dynamic::Map(m)) => {
            if let Some(child) = m.get(key) {
                walk(child, rest, at.key(key), found);
            }
        }
        _ => {}
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0
                && matches!(
                    step,
                    ExpressionStep::AttributeName(_) | ExpressionStep::Parent
                )
            {
                write!(f, ".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Merges `exprs` onto `base`, see [`PathExpression::merge`]
pub fn merge_expressions(base: &PathExpression, exprs: &[PathExpression]) -> Vec<PathExpression> {
    base.merge_expressions(exprs)
}

/// Renders a set of expressions as `[a,b]` for diagnostics
pub fn display_expressions(exprs: &[PathExpression]) -> String {
    let parts: Vec<String> = exprs.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(","))
}
