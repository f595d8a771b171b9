//! The canonical byte encoding used to compute a fact's content hash.
//!
//! Layout (spec §4.1):
//! 1. the fact type, verbatim;
//! 2. predecessors, sorted by role name; within a role, references are
//!    sorted by `(type, hash)` unless the role is declared ordered
//!    ([`crate::Predecessors::List`]), in which case declaration order is
//!    preserved;
//! 3. fields, sorted by field name, with numbers in their shortest exact
//!    decimal form and timestamps normalized to millisecond-precision UTC
//!    ISO-8601.
//!
//! The encoding itself only needs to be deterministic, not compact or
//! self-describing to any other system — nothing outside this crate ever
//! deserializes it. It is hashed with BLAKE3 and never stored.

use chrono::SecondsFormat;

use crate::{Fact, FactError, Predecessors, Scalar};

pub(crate) fn canonical_bytes(fact: &Fact) -> Result<Vec<u8>, FactError> {
    let mut buf = Vec::new();
    write_str(&mut buf, &fact.fact_type);

    write_u32(&mut buf, fact.predecessors.len() as u32);
    // `fact.predecessors` is a `BTreeMap`, so iteration is already sorted by
    // role name.
    for (role, predecessors) in fact.predecessors.iter() {
        write_str(&mut buf, role);
        write_predecessors(&mut buf, predecessors);
    }

    write_u32(&mut buf, fact.fields.len() as u32);
    // Likewise already sorted by field name.
    for (name, value) in fact.fields.iter() {
        if !value.is_serializable() {
            return Err(FactError::InvalidFact(format!(
                "field {name:?} holds a non-finite number"
            )));
        }
        write_str(&mut buf, name);
        write_scalar(&mut buf, value);
    }

    Ok(buf)
}

fn write_predecessors(buf: &mut Vec<u8>, predecessors: &Predecessors) {
    match predecessors {
        Predecessors::Single(reference) => {
            buf.push(0);
            write_u32(buf, 1);
            write_str(buf, &reference.fact_type);
            buf.extend_from_slice(reference.hash.as_bytes());
        }
        Predecessors::Set(references) => {
            buf.push(1);
            let mut sorted = references.clone();
            sorted.sort();
            write_u32(buf, sorted.len() as u32);
            for reference in &sorted {
                write_str(buf, &reference.fact_type);
                buf.extend_from_slice(reference.hash.as_bytes());
            }
        }
        Predecessors::List(references) => {
            buf.push(2);
            write_u32(buf, references.len() as u32);
            for reference in references {
                write_str(buf, &reference.fact_type);
                buf.extend_from_slice(reference.hash.as_bytes());
            }
        }
    }
}

fn write_scalar(buf: &mut Vec<u8>, value: &Scalar) {
    match value {
        Scalar::String(s) => {
            buf.push(0);
            write_str(buf, s);
        }
        Scalar::Number(n) => {
            buf.push(1);
            write_str(buf, &format_number(*n));
        }
        Scalar::Bool(b) => {
            buf.push(2);
            buf.push(if *b { 1 } else { 0 });
        }
        Scalar::Timestamp(t) => {
            buf.push(3);
            write_str(buf, &t.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }
}

/// Rust's `Display` for `f64` already produces the shortest decimal string
/// that round-trips back to the same value, which is exactly what spec
/// §4.1's "shortest exact decimal form" asks for. Negative zero is
/// normalized to `0` so that `0.0` and `-0.0` hash identically.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_str(buf: &mut Vec<u8>, value: &str) {
    write_u32(buf, value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
}
