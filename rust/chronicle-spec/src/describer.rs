//! The exact inverse of [`crate::parser::parse`] at the AST level (spec
//! §4.2). Output whitespace is chosen for readability only; the round-trip
//! law holds modulo whitespace, not byte-for-byte.

use crate::{Condition, ExistentialCondition, Given, Match, Projection, Role, Specification};

/// Render a specification back to its textual form.
pub fn describe(spec: &Specification) -> String {
    let mut out = String::new();
    describe_specification(spec, &mut out);
    out
}

fn describe_specification(spec: &Specification, out: &mut String) {
    out.push('(');
    for (i, given) in spec.given.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        describe_given(given, out);
    }
    out.push_str(") { ");
    for m in &spec.matches {
        describe_match(m, out);
        out.push(' ');
    }
    out.push_str("} => ");
    describe_projection(&spec.projection, out);
}

fn describe_given(given: &Given, out: &mut String) {
    out.push_str(&given.label.name);
    out.push_str(": ");
    out.push_str(&given.label.fact_type);
    if !given.conditions.is_empty() {
        out.push_str(" [ ");
        for c in &given.conditions {
            describe_existential(c, out);
            out.push(' ');
        }
        out.push(']');
    }
}

fn describe_match(m: &Match, out: &mut String) {
    out.push_str(&m.unknown.name);
    out.push_str(": ");
    out.push_str(&m.unknown.fact_type);
    if !m.conditions.is_empty() {
        out.push_str(" [ ");
        for c in &m.conditions {
            describe_condition(&m.unknown.name, c, out);
            out.push(' ');
        }
        out.push(']');
    }
}

fn describe_condition(subject: &str, condition: &Condition, out: &mut String) {
    match condition {
        Condition::Path {
            roles_left,
            label_right,
            roles_right,
        } => {
            out.push_str(subject);
            for role in roles_left {
                describe_role(role, out);
            }
            out.push_str(" = ");
            out.push_str(label_right);
            for role in roles_right {
                describe_role(role, out);
            }
        }
        Condition::Existential(existential) => describe_existential(existential, out),
    }
}

fn describe_role(role: &Role, out: &mut String) {
    out.push_str("->");
    out.push_str(&role.name);
    out.push(':');
    out.push_str(&role.predecessor_type);
}

fn describe_existential(existential: &ExistentialCondition, out: &mut String) {
    out.push_str(if existential.exists { "E { " } else { "!E { " });
    for m in &existential.matches {
        describe_match(m, out);
        out.push(' ');
    }
    out.push('}');
}

fn describe_projection(projection: &Projection, out: &mut String) {
    match projection {
        Projection::Fact(label) => out.push_str(label),
        Projection::Field(label, field) => {
            out.push_str(label);
            out.push('.');
            out.push_str(field);
        }
        Projection::Hash(label) => {
            out.push('#');
            out.push_str(label);
        }
        Projection::Composite(fields) => {
            out.push_str("{ ");
            for (i, (name, nested)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(" = ");
                describe_projection(nested, out);
            }
            out.push_str(" }");
        }
        Projection::Specification(nested) => describe_specification(nested, out),
    }
}
