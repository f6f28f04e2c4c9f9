use campaign_core::db::open_db_in_memory;
use campaign_core::{
    AttributionError, AttributionRequest, AttributionService, Confidence, EditAttributionRequest,
    EmbedOutcome, MergePolicy, ObjectRef, ObjectRepository, ObjectType, SqliteObjectRepository,
    TopLevelObject,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> AttributionService<SqliteObjectRepository<'_>> {
    AttributionService::new(SqliteObjectRepository::try_new(conn).unwrap())
}

fn create_object(conn: &Connection, kind: ObjectType, value: &str) -> ObjectRef {
    let repo = SqliteObjectRepository::try_new(conn).unwrap();
    let object = TopLevelObject::new(kind, value);
    repo.create_object(&object, "seed").unwrap();
    object.object_ref()
}

fn load(conn: &Connection, object: ObjectRef) -> TopLevelObject {
    SqliteObjectRepository::try_new(conn)
        .unwrap()
        .resolve(object)
        .unwrap()
        .unwrap()
}

#[test]
fn attribute_adds_entry_and_persists_it() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");

    let mut request = AttributionRequest::new(sample, "Foo", Confidence::Medium, "alice");
    request.description = "shared loader".to_string();
    let report = service.attribute(request).unwrap();

    assert_eq!(report.object, sample);
    assert_eq!(report.outcome, EmbedOutcome::Added);
    assert!(report.propagation.is_empty());
    assert!(report.entry.date > 0);

    let stored = load(&conn, sample);
    let entry = stored.campaigns.get("Foo").unwrap();
    assert_eq!(entry, &report.entry);
    assert_eq!(entry.analyst, "alice");
    assert_eq!(entry.description, "shared loader");
    assert_eq!(stored.modified_by.as_deref(), Some("alice"));
}

#[test]
fn repeated_attribution_merges_confidence_but_keeps_analyst() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");

    let first = service
        .attribute(AttributionRequest::new(sample, "Foo", Confidence::Low, "alice"))
        .unwrap();
    let mut again = AttributionRequest::new(sample, "Foo", Confidence::High, "bob");
    again.description = "confirmed".to_string();
    let second = service.attribute(again).unwrap();

    assert_eq!(second.outcome, EmbedOutcome::Merged);
    let stored = load(&conn, sample);
    assert_eq!(stored.campaigns.len(), 1);
    let entry = stored.campaigns.get("Foo").unwrap();
    assert_eq!(entry.confidence, Confidence::High);
    assert_eq!(entry.description, "confirmed");
    assert_eq!(entry.analyst, "alice");
    assert_eq!(entry.date, first.entry.date);
}

#[test]
fn keep_existing_policy_succeeds_without_change() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");

    service
        .attribute(AttributionRequest::new(sample, "Foo", Confidence::Low, "alice"))
        .unwrap();
    let mut again = AttributionRequest::new(sample, "Foo", Confidence::High, "bob");
    again.merge = MergePolicy::KeepExisting;
    let report = service.attribute(again).unwrap();

    assert_eq!(report.outcome, EmbedOutcome::Unchanged);
    assert_eq!(report.entry.confidence, Confidence::Low);
    assert_eq!(
        load(&conn, sample).campaigns.get("Foo").unwrap().confidence,
        Confidence::Low
    );
}

#[test]
fn attributions_keep_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let actor = create_object(&conn, ObjectType::Actor, "Group Z");

    for name in ["Zeta", "Alpha", "Mid"] {
        service
            .attribute(AttributionRequest::new(actor, name, Confidence::Low, "alice"))
            .unwrap();
    }

    let names: Vec<_> = service
        .attributions(actor)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
}

#[test]
fn blank_campaign_name_is_rejected_before_lookup() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = ObjectRef::new(ObjectType::Sample, Uuid::new_v4());

    let err = service
        .attribute(AttributionRequest::new(missing, "  ", Confidence::Low, "alice"))
        .unwrap_err();
    assert!(matches!(err, AttributionError::InvalidRequest(_)));
}

#[test]
fn unknown_target_is_object_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");
    let wrong_kind = ObjectRef::new(ObjectType::Domain, sample.id);

    let err = service
        .attribute(AttributionRequest::new(wrong_kind, "Foo", Confidence::Low, "alice"))
        .unwrap_err();
    assert!(matches!(err, AttributionError::ObjectNotFound(object) if object == wrong_kind));
}

#[test]
fn loaded_target_is_saved_without_lookup() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let domain = create_object(&conn, ObjectType::Domain, "evil.example.com");
    let loaded = load(&conn, domain);

    let report = service
        .attribute(AttributionRequest::new(loaded, "Foo", Confidence::High, "alice"))
        .unwrap();

    assert_eq!(report.object, domain);
    assert!(load(&conn, domain).campaigns.contains("Foo"));
}

#[test]
fn loaded_target_missing_from_store_is_object_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let detached = TopLevelObject::new(ObjectType::Email, "phish@example.com");
    let detached_ref = detached.object_ref();

    let err = service
        .attribute(AttributionRequest::new(detached, "Foo", Confidence::High, "alice"))
        .unwrap_err();
    assert!(matches!(err, AttributionError::ObjectNotFound(object) if object == detached_ref));
}

#[test]
fn edit_replaces_every_field_of_the_entry() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");
    service
        .attribute(AttributionRequest::new(sample, "Foo", Confidence::Low, "alice"))
        .unwrap();

    let report = service
        .edit(EditAttributionRequest {
            object: sample,
            campaign: "Foo".to_string(),
            confidence: Confidence::High,
            description: "reviewed".to_string(),
            date: Some(42),
            analyst: "bob".to_string(),
            propagate: false,
        })
        .unwrap();

    assert_eq!(report.outcome, EmbedOutcome::Replaced);
    let entry = load(&conn, sample).campaigns.get("Foo").cloned().unwrap();
    assert_eq!(entry.confidence, Confidence::High);
    assert_eq!(entry.description, "reviewed");
    assert_eq!(entry.analyst, "bob");
    assert_eq!(entry.date, 42);
}

#[test]
fn edit_distinguishes_missing_object_from_missing_attribution() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");
    let edit = |object: ObjectRef| EditAttributionRequest {
        object,
        campaign: "Foo".to_string(),
        confidence: Confidence::High,
        description: String::new(),
        date: None,
        analyst: "bob".to_string(),
        propagate: false,
    };

    let err = service.edit(edit(sample)).unwrap_err();
    assert!(matches!(
        err,
        AttributionError::AttributionNotFound { ref campaign, .. } if campaign == "Foo"
    ));

    let missing = ObjectRef::new(ObjectType::Sample, Uuid::new_v4());
    let err = service.edit(edit(missing)).unwrap_err();
    assert!(matches!(err, AttributionError::ObjectNotFound(_)));
}

#[test]
fn remove_returns_entry_and_is_not_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sample = create_object(&conn, ObjectType::Sample, "abc123");
    service
        .attribute(AttributionRequest::new(sample, "Foo", Confidence::Low, "alice"))
        .unwrap();
    service
        .attribute(AttributionRequest::new(sample, "Bar", Confidence::Low, "alice"))
        .unwrap();

    let removed = service.remove(sample, "Foo", "bob").unwrap();
    assert_eq!(removed.name, "Foo");

    let remaining = service.attributions(sample).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Bar");

    let err = service.remove(sample, "Foo", "bob").unwrap_err();
    assert!(matches!(err, AttributionError::AttributionNotFound { .. }));
}

#[test]
fn invalid_stored_value_surfaces_as_validation_failure() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut ip = TopLevelObject::new(ObjectType::Ip, "10.0.0.1");
    SqliteObjectRepository::try_new(&conn)
        .unwrap()
        .create_object(&ip, "seed")
        .unwrap();
    ip.value = "not-an-ip".to_string();

    let err = service
        .attribute(AttributionRequest::new(ip, "Foo", Confidence::Low, "alice"))
        .unwrap_err();
    assert!(matches!(err, AttributionError::ValidationFailed { .. }));
}
