//! Rendering of store-neutral queries into Semantic MediaWiki `#ask` syntax.

use crate::domain::properties::Property;
use crate::domain::query::{Condition, DataQuery, QueryExpression};

/// Conditions part of an ask query, e.g. `[[Category:Games]][[Has name::~A*]]`.
pub fn render_expression(expression: &QueryExpression) -> String {
    let mut out = String::new();
    if let Some(category) = expression.category {
        out.push_str(&format!("[[Category:{}]]", category.as_str()));
    }
    for condition in &expression.conditions {
        out.push_str(&render_condition(condition));
    }
    out
}

fn render_condition(condition: &Condition) -> String {
    match condition {
        Condition::AnyPrefix(property, prefixes) => {
            let alternatives: Vec<String> = prefixes.iter().map(|p| format!("~{p}*")).collect();
            property_condition(*property, &alternatives.join("||"))
        }
        Condition::Contains(property, text) => property_condition(*property, &format!("~*{text}*")),
        Condition::Wildcard(property, text) => property_condition(*property, &format!("*{text}*")),
        Condition::Equals(property, value) => property_condition(*property, value),
        Condition::AnyOf(property, values) => property_condition(*property, &values.join("||")),
        Condition::GreaterThan(property, value) => {
            property_condition(*property, &format!(">{value}"))
        }
        Condition::LessThan(property, value) => property_condition(*property, &format!("<{value}")),
        Condition::NotSubobjectOf(suffix) => {
            format!("[[-{}::~*/{suffix}]]", Property::Subobject.label())
        }
    }
}

fn property_condition(property: Property, value: &str) -> String {
    format!("[[{}::{value}]]", property.label())
}

/// Full ask query: conditions, printouts, then sort and window parameters.
pub fn render_query(query: &DataQuery) -> String {
    let mut out = render_expression(&query.expression);
    for property in &query.projections {
        out.push_str("|?");
        out.push_str(property.label());
    }
    if let Some(sort) = query.sort {
        out.push_str(&format!(
            "|sort={}|order={}",
            sort.property.label(),
            sort.order.as_str()
        ));
    }
    out.push_str(&format!("|limit={}", query.limit));
    if query.offset > 0 {
        out.push_str(&format!("|offset={}", query.offset));
    }
    out
}

/// One page of a count query: subjects only, `limit` per page from `offset`.
pub fn render_count(expression: &QueryExpression, limit: u32, offset: u64) -> String {
    let mut out = format!("{}|limit={limit}", render_expression(expression));
    if offset > 0 {
        out.push_str(&format!("|offset={offset}"));
    }
    out
}
