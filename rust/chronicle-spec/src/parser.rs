//! Textual specification parser (spec §6): `(given…) { match… } => projection`.
//!
//! Whitespace is insignificant; identifiers match `[A-Za-z_][A-Za-z0-9_.]*`
//! (fact types may be namespaced with a dot, e.g. `Office.Closed`). A
//! projection head is only split into `label.field` at its first dot, since
//! a bare label never itself contains one.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, multispace0};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

use crate::error::{ParseError, Position};
use crate::{Condition, ExistentialCondition, Given, Label, Match, Projection, Role, Specification};

/// Parse the textual specification format. Fails with [`ParseError`] on
/// malformed input or trailing garbage.
pub fn parse(input: &str) -> Result<Specification, ParseError> {
    match all_consuming(delimited(multispace0, specification, multispace0))(input) {
        Ok((_, spec)) => Ok(spec),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_parse_error(input, &e)),
        Err(nom::Err::Incomplete(_)) => Err(ParseError {
            position: Position { offset: input.len() },
            expected: "more input".to_string(),
        }),
    }
}

fn to_parse_error(original: &str, e: &nom::error::Error<&str>) -> ParseError {
    let offset = original.len() - e.input.len();
    ParseError {
        position: Position { offset },
        expected: format!("{:?}", e.code),
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_"), tag(".")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

fn role_step(input: &str) -> IResult<&str, Role> {
    map(
        preceded(
            tag("->"),
            pair(
                preceded(multispace0, identifier),
                preceded(tuple((multispace0, tag(":"), multispace0)), identifier),
            ),
        ),
        |(name, predecessor_type)| Role::new(name, predecessor_type),
    )(input)
}

fn role_chain(input: &str) -> IResult<&str, (String, Vec<Role>)> {
    pair(identifier, many0(preceded(multispace0, role_step)))(input)
}

fn path_condition(input: &str) -> IResult<&str, Condition> {
    map(
        tuple((
            role_chain,
            preceded(tuple((multispace0, tag("="), multispace0)), role_chain),
        )),
        |((_subject, roles_left), (label_right, roles_right))| Condition::Path {
            roles_left,
            label_right,
            roles_right,
        },
    )(input)
}

fn existential_condition(input: &str) -> IResult<&str, ExistentialCondition> {
    alt((
        map(
            preceded(
                tuple((tag("!E"), multispace0, tag("{"))),
                terminated_match_list,
            ),
            |matches| ExistentialCondition {
                exists: false,
                matches,
            },
        ),
        map(
            preceded(
                tuple((tag("E"), multispace0, tag("{"))),
                terminated_match_list,
            ),
            |matches| ExistentialCondition {
                exists: true,
                matches,
            },
        ),
    ))(input)
}

fn terminated_match_list(input: &str) -> IResult<&str, Vec<Match>> {
    map(pair(match_list, preceded(multispace0, tag("}"))), |(matches, _)| matches)(input)
}

fn condition(input: &str) -> IResult<&str, Condition> {
    alt((map(existential_condition, Condition::Existential), path_condition))(input)
}

fn condition_list(input: &str) -> IResult<&str, Vec<Condition>> {
    delimited(
        tag("["),
        many0(preceded(multispace0, condition)),
        preceded(multispace0, tag("]")),
    )(input)
}

fn given_condition_list(input: &str) -> IResult<&str, Vec<ExistentialCondition>> {
    delimited(
        tag("["),
        many0(preceded(multispace0, existential_condition)),
        preceded(multispace0, tag("]")),
    )(input)
}

fn match_decl(input: &str) -> IResult<&str, Match> {
    map(
        tuple((
            identifier,
            preceded(tuple((multispace0, tag(":"), multispace0)), identifier),
            opt(preceded(multispace0, condition_list)),
        )),
        |(name, fact_type, conditions)| Match {
            unknown: Label::new(name, fact_type),
            conditions: conditions.unwrap_or_default(),
        },
    )(input)
}

fn match_list(input: &str) -> IResult<&str, Vec<Match>> {
    many0(preceded(multispace0, match_decl))(input)
}

fn given_decl(input: &str) -> IResult<&str, Given> {
    map(
        tuple((
            identifier,
            preceded(tuple((multispace0, tag(":"), multispace0)), identifier),
            opt(preceded(multispace0, given_condition_list)),
        )),
        |(name, fact_type, conditions)| Given {
            label: Label::new(name, fact_type),
            conditions: conditions.unwrap_or_default(),
        },
    )(input)
}

fn given_list(input: &str) -> IResult<&str, Vec<Given>> {
    delimited(
        tag("("),
        separated_list0(preceded(multispace0, tag(",")), preceded(multispace0, given_decl)),
        preceded(multispace0, tag(")")),
    )(input)
}

fn hash_projection(input: &str) -> IResult<&str, Projection> {
    map(preceded(tag("#"), identifier), Projection::Hash)(input)
}

fn fact_or_field_projection(input: &str) -> IResult<&str, Projection> {
    map(identifier, |lexeme| match lexeme.split_once('.') {
        Some((label, field)) => Projection::Field(label.to_string(), field.to_string()),
        None => Projection::Fact(lexeme),
    })(input)
}

fn composite_field(input: &str) -> IResult<&str, (String, Projection)> {
    pair(
        identifier,
        preceded(tuple((multispace0, tag("="), multispace0)), projection),
    )(input)
}

fn composite_projection(input: &str) -> IResult<&str, Projection> {
    map(
        delimited(
            tag("{"),
            separated_list0(
                preceded(multispace0, tag(",")),
                preceded(multispace0, composite_field),
            ),
            preceded(multispace0, tag("}")),
        ),
        Projection::Composite,
    )(input)
}

fn nested_specification_projection(input: &str) -> IResult<&str, Projection> {
    map(specification, |spec| Projection::Specification(Box::new(spec)))(input)
}

fn projection(input: &str) -> IResult<&str, Projection> {
    alt((
        nested_specification_projection,
        composite_projection,
        hash_projection,
        fact_or_field_projection,
    ))(input)
}

fn specification(input: &str) -> IResult<&str, Specification> {
    map(
        tuple((
            given_list,
            preceded(tuple((multispace0, tag("{"))), match_list),
            preceded(tuple((multispace0, tag("}"), multispace0, tag("=>"), multispace0)), projection),
        )),
        |(given, matches, projection)| Specification {
            given,
            matches,
            projection,
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_a_basic_successor_read() {
        let spec = parse("(c: Company) { o: Office [ o->company:Company = c ] } => o").unwrap();
        assert_eq!(spec.given[0].label.name, "c");
        assert_eq!(spec.matches[0].unknown.fact_type, "Office");
        assert_eq!(spec.projection, Projection::Fact("o".to_string()));
    }

    #[test]
    fn it_parses_a_negative_existential_condition() {
        let spec = parse(
            "(c: Company) { o: Office [ o->company:Company = c !E { x: Office.Closed [ x->office:Office = o ] } ] } => o",
        )
        .unwrap();
        assert_eq!(spec.matches[0].conditions.len(), 2);
        assert!(matches!(
            spec.matches[0].conditions[1],
            Condition::Existential(ExistentialCondition { exists: false, .. })
        ));
    }

    #[test]
    fn it_parses_a_composite_projection_with_a_nested_specification() {
        let spec = parse(
            "(c: Company) { o: Office [ o->company:Company = c ] } => { office = o, managers = (o: Office) { m: Manager [ m->office:Office = o ] } => m }",
        )
        .unwrap();
        match &spec.projection {
            Projection::Composite(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0, "office");
                assert!(matches!(fields[1].1, Projection::Specification(_)));
            }
            other => panic!("expected composite projection, got {other:?}"),
        }
    }

    #[test]
    fn it_parses_a_hash_projection() {
        let spec = parse("(c: Company) { } => #c").unwrap();
        assert_eq!(spec.projection, Projection::Hash("c".to_string()));
    }

    #[test]
    fn it_parses_a_field_projection() {
        let spec = parse("(c: Company) { } => c.id").unwrap();
        assert_eq!(spec.projection, Projection::Field("c".to_string(), "id".to_string()));
    }

    #[test]
    fn it_reports_a_position_on_malformed_input() {
        let err = parse("(c Company) { } => c").unwrap_err();
        assert!(err.position.offset > 0);
        assert!(!err.expected.is_empty());
    }
}
