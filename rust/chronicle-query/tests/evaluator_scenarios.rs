use chronicle_facts::Fact;
use chronicle_query::{Evaluator, MemoryStore, ProjectedValue, Store};
use chronicle_spec::{Condition, ExistentialCondition, Given, Label, Match, Projection, Role, Specification};

fn office_by_company() -> Specification {
    Specification::new(
        vec![Given::new(Label::new("c", "Company"))],
        vec![Match::new(Label::new("o", "Office")).with_condition(Condition::Path {
            roles_left: vec![Role::new("company", "Company")],
            label_right: "c".to_string(),
            roles_right: vec![],
        })],
        Projection::Fact("o".to_string()),
    )
    .unwrap()
}

fn open_offices_by_company() -> Specification {
    let closed_existential = ExistentialCondition {
        exists: false,
        matches: vec![Match::new(Label::new("x", "Office.Closed")).with_condition(Condition::Path {
            roles_left: vec![Role::new("office", "Office")],
            label_right: "o".to_string(),
            roles_right: vec![],
        })],
    };
    Specification::new(
        vec![Given::new(Label::new("c", "Company"))],
        vec![Match::new(Label::new("o", "Office"))
            .with_condition(Condition::Path {
                roles_left: vec![Role::new("company", "Company")],
                label_right: "c".to_string(),
                roles_right: vec![],
            })
            .with_condition(Condition::Existential(closed_existential))],
        Projection::Fact("o".to_string()),
    )
    .unwrap()
}

fn fact_id(fact: &Fact) -> &str {
    match fact.fields.get("id").unwrap() {
        chronicle_facts::Scalar::String(id) => id.as_str(),
        _ => panic!("expected a string id"),
    }
}

#[tokio::test]
async fn basic_successor_read_finds_the_office_under_its_company() {
    let store = MemoryStore::new();
    let company = Fact::new("Company").with_field("id", "Acme");
    let company_ref = store.save(vec![company]).await.unwrap().remove(0);
    let office = Fact::new("Office")
        .with_predecessor("company", company_ref.clone())
        .with_field("id", "TestOffice");
    store.save(vec![office]).await.unwrap();

    let evaluator = Evaluator::new(store);
    let rows = evaluator
        .read(&[company_ref], &office_by_company())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let ProjectedValue::Fact(fact) = &rows[0].value else {
        panic!("expected a fact projection");
    };
    assert_eq!(fact_id(fact), "TestOffice");
}

#[tokio::test]
async fn negative_existential_excludes_a_closed_office() {
    let store = MemoryStore::new();
    let company = Fact::new("Company").with_field("id", "Acme");
    let company_ref = store.save(vec![company]).await.unwrap().remove(0);

    let open_office = Fact::new("Office")
        .with_predecessor("company", company_ref.clone())
        .with_field("id", "OpenOffice");
    let closed_office = Fact::new("Office")
        .with_predecessor("company", company_ref.clone())
        .with_field("id", "ClosedOffice");
    let open_ref = store.save(vec![open_office]).await.unwrap().remove(0);
    let closed_ref = store.save(vec![closed_office]).await.unwrap().remove(0);

    let closure = Fact::new("Office.Closed").with_predecessor("office", closed_ref);
    store.save(vec![closure]).await.unwrap();

    let evaluator = Evaluator::new(store);
    let rows = evaluator
        .read(&[company_ref], &open_offices_by_company())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let ProjectedValue::Fact(fact) = &rows[0].value else {
        panic!("expected a fact projection");
    };
    assert_eq!(fact_id(fact), "OpenOffice");
    assert_eq!(rows[0].identity, vec![open_ref.hash]);
}

#[tokio::test]
async fn given_type_mismatch_is_rejected_before_evaluation() {
    let store = MemoryStore::new();
    let office = Fact::new("Office").with_field("id", "TestOffice");
    let office_ref = store.save(vec![office]).await.unwrap().remove(0);

    let evaluator = Evaluator::new(store);
    let result = evaluator.read(&[office_ref], &office_by_company()).await;

    assert!(matches!(
        result,
        Err(chronicle_query::QueryError::GivenMismatch(_))
    ));
}
