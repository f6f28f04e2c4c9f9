use campaign_core::db::open_db_in_memory;
use campaign_core::{
    AliasInput, CampaignService, CampaignServiceError, CampaignStatus, NewCampaignRequest,
    ObjectRef, ObjectRepository, ObjectType, RelatedObject, RelationshipType,
    SqliteCampaignRepository, SqliteObjectRepository, TopLevelObject,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(
    conn: &Connection,
) -> CampaignService<SqliteCampaignRepository<'_>, SqliteObjectRepository<'_>> {
    CampaignService::new(
        SqliteCampaignRepository::try_new(conn).unwrap(),
        SqliteObjectRepository::try_new(conn).unwrap(),
    )
}

fn create_object(conn: &Connection, kind: ObjectType, value: &str) -> ObjectRef {
    let repo = SqliteObjectRepository::try_new(conn).unwrap();
    let object = TopLevelObject::new(kind, value);
    repo.create_object(&object, "seed").unwrap();
    object.object_ref()
}

#[test]
fn create_stores_normalized_aliases_and_defaults() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut request = NewCampaignRequest::new("Foo", "alice");
    request.description = "first wave".to_string();
    request.aliases = AliasInput::from(" beta, alpha ,, beta");
    request.bucket_list = Some(AliasInput::from(vec!["apt".to_string(), " apt ".to_string()]));
    request.tickets = Some(AliasInput::from("T-2,T-1"));
    let id = service.create(request).unwrap();

    let campaign = service.get("Foo").unwrap().unwrap();
    assert_eq!(campaign.id, id);
    assert_eq!(campaign.description, "first wave");
    assert_eq!(campaign.aliases, vec!["alpha", "beta"]);
    assert_eq!(campaign.bucket_list, vec!["apt"]);
    assert_eq!(campaign.tickets, vec!["T-1", "T-2"]);
    assert_eq!(campaign.status, CampaignStatus::New);
    assert!(campaign.ttps.is_empty());
}

#[test]
fn create_with_existing_name_fails_without_touching_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut first = NewCampaignRequest::new("Foo", "alice");
    first.description = "original".to_string();
    let id = service.create(first).unwrap();

    let mut second = NewCampaignRequest::new("Foo", "bob");
    second.description = "replacement".to_string();
    second.aliases = AliasInput::from("x");
    let err = service.create(second).unwrap_err();

    match err {
        CampaignServiceError::AlreadyExists { name, id: existing } => {
            assert_eq!(name, "Foo");
            assert_eq!(existing, Some(id));
        }
        other => panic!("unexpected error: {other}"),
    }
    let campaign = service.get("Foo").unwrap().unwrap();
    assert_eq!(campaign.description, "original");
    assert!(campaign.aliases.is_empty());
    assert_eq!(campaign.modified_by.as_deref(), Some("alice"));
}

#[test]
fn names_are_exact_match() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service.create(NewCampaignRequest::new("Foo", "alice")).unwrap();
    service.create(NewCampaignRequest::new("foo", "alice")).unwrap();

    assert_eq!(service.list_names(false).unwrap(), vec!["Foo", "foo"]);
    assert!(service.get("FOO").unwrap().is_none());
}

#[test]
fn create_with_blank_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create(NewCampaignRequest::new("   ", "alice"))
        .unwrap_err();
    assert!(matches!(err, CampaignServiceError::ValidationFailed { .. }));
    assert!(service.list_names(false).unwrap().is_empty());
}

#[test]
fn create_with_related_object_links_both_sides() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let indicator = create_object(&conn, ObjectType::Indicator, "evil.exe");

    let mut request = NewCampaignRequest::new("Foo", "alice");
    request.related = Some(RelatedObject {
        object: indicator,
        relationship: RelationshipType::AttributedTo,
    });
    let id = service.create(request).unwrap();

    let campaign = service.get_by_id(id).unwrap().unwrap();
    assert_eq!(campaign.relationships.len(), 1);
    let edge = &campaign.relationships[0];
    assert_eq!(edge.object_id, indicator.id);
    assert_eq!(edge.rel_type, "Indicator");
    assert_eq!(edge.relationship, RelationshipType::Attributed);

    let objects = SqliteObjectRepository::try_new(&conn).unwrap();
    let loaded = objects.resolve(indicator).unwrap().unwrap();
    assert_eq!(loaded.relationships.len(), 1);
    assert_eq!(loaded.relationships[0].object_id, id);
    assert_eq!(loaded.relationships[0].rel_type, "Campaign");
    assert_eq!(
        loaded.relationships[0].relationship,
        RelationshipType::AttributedTo
    );
}

#[test]
fn create_with_missing_related_object_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = ObjectRef::new(ObjectType::Sample, Uuid::new_v4());

    let mut request = NewCampaignRequest::new("Foo", "alice");
    request.related = Some(RelatedObject {
        object: missing,
        relationship: RelationshipType::RelatedTo,
    });
    let err = service.create(request).unwrap_err();

    assert!(matches!(
        err,
        CampaignServiceError::RelatedObjectNotFound(object) if object == missing
    ));
    assert!(service.get("Foo").unwrap().is_none());
}

#[test]
fn activate_and_deactivate_control_active_listing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.create(NewCampaignRequest::new("Foo", "alice")).unwrap();
    service.create(NewCampaignRequest::new("Bar", "alice")).unwrap();

    service.deactivate("Foo", "bob").unwrap();
    service.deactivate("Foo", "bob").unwrap();
    assert_eq!(service.list_names(true).unwrap(), vec!["Bar"]);
    assert_eq!(service.list_names(false).unwrap(), vec!["Bar", "Foo"]);

    service.activate("Foo", "bob").unwrap();
    let campaign = service.get("Foo").unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Analyzed);
    assert_eq!(campaign.modified_by.as_deref(), Some("bob"));
    assert_eq!(service.list_names(true).unwrap(), vec!["Bar", "Foo"]);

    service
        .set_status("Foo", CampaignStatus::InProgress, "bob")
        .unwrap();
    assert_eq!(
        service.get("Foo").unwrap().unwrap().status,
        CampaignStatus::InProgress
    );
}

#[test]
fn status_change_on_unknown_name_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service.activate("Ghost", "bob").unwrap_err();
    assert!(matches!(err, CampaignServiceError::NotFound(name) if name == "Ghost"));
}

#[test]
fn set_aliases_replaces_the_set_and_edit_description_overwrites() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut request = NewCampaignRequest::new("Foo", "alice");
    request.aliases = AliasInput::from("a,b");
    service.create(request).unwrap();

    service
        .set_aliases("Foo", &AliasInput::from("c, b"), "bob")
        .unwrap();
    service.edit_description("Foo", "rewritten", "bob").unwrap();

    let campaign = service.get("Foo").unwrap().unwrap();
    assert_eq!(campaign.aliases, vec!["b", "c"]);
    assert_eq!(campaign.description, "rewritten");
}

#[test]
fn ttp_add_edit_remove() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create(NewCampaignRequest::new("Foo", "alice")).unwrap();

    service.add_ttp(id, "spear phishing", "alice").unwrap();
    service.add_ttp(id, "watering hole", "bob").unwrap();
    let campaign = service.add_ttp(id, "spear phishing", "carol").unwrap();
    assert_eq!(campaign.ttps.len(), 2);

    let campaign = service
        .edit_ttp(id, "spear phishing", "whaling", "bob")
        .unwrap();
    let texts: Vec<_> = campaign.ttps.iter().map(|ttp| ttp.ttp.as_str()).collect();
    assert_eq!(texts, vec!["whaling", "watering hole"]);

    let stored = service.get_by_id(id).unwrap().unwrap();
    let first = stored.ttps.iter().next().unwrap();
    assert_eq!(first.ttp, "whaling");
    assert_eq!(first.analyst, "alice");

    let campaign = service.remove_ttp(id, "whaling", "bob").unwrap();
    assert_eq!(campaign.ttps.len(), 1);

    let err = service.remove_ttp(id, "whaling", "bob").unwrap_err();
    assert!(matches!(err, CampaignServiceError::TtpNotFound(ttp) if ttp == "whaling"));
    let err = service
        .edit_ttp(id, "missing", "other", "bob")
        .unwrap_err();
    assert!(matches!(err, CampaignServiceError::TtpNotFound(_)));
}

#[test]
fn blank_ttp_text_is_rejected_and_nothing_is_saved() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create(NewCampaignRequest::new("Foo", "alice")).unwrap();
    service.add_ttp(id, "spear phishing", "alice").unwrap();

    let err = service.add_ttp(id, "   ", "bob").unwrap_err();
    assert!(matches!(err, CampaignServiceError::ValidationFailed { .. }));

    let err = service
        .edit_ttp(id, "spear phishing", "", "bob")
        .unwrap_err();
    assert!(matches!(err, CampaignServiceError::ValidationFailed { .. }));

    let stored = service.get_by_id(id).unwrap().unwrap();
    let texts: Vec<_> = stored.ttps.iter().map(|ttp| ttp.ttp.as_str()).collect();
    assert_eq!(texts, vec!["spear phishing"]);
    assert_eq!(stored.modified_by.as_deref(), Some("alice"));
}

#[test]
fn ttp_ops_on_unknown_id_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ghost = Uuid::new_v4();

    let err = service.add_ttp(ghost, "x", "alice").unwrap_err();
    assert!(matches!(err, CampaignServiceError::IdNotFound(id) if id == ghost));
}

#[test]
fn remove_deletes_campaign_but_leaves_attributions_dangling() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let objects = SqliteObjectRepository::try_new(&conn).unwrap();

    let sample = create_object(&conn, ObjectType::Sample, "abc123");
    let mut request = NewCampaignRequest::new("Foo", "alice");
    request.related = Some(RelatedObject {
        object: sample,
        relationship: RelationshipType::RelatedTo,
    });
    let id = service.create(request).unwrap();
    service.add_ttp(id, "spear phishing", "alice").unwrap();

    let mut loaded = objects.resolve(sample).unwrap().unwrap();
    loaded.campaigns.embed(
        &campaign_core::NewAttribution::new(
            "Foo",
            campaign_core::Confidence::High,
            "",
            "alice",
        ),
        1,
        campaign_core::MergePolicy::Merge,
    );
    objects.save_object(&loaded, "alice").unwrap();

    let removed = service.remove("Foo", "bob").unwrap();
    assert_eq!(removed.id, id);
    assert_eq!(removed.modified_by.as_deref(), Some("bob"));
    assert_eq!(removed.ttps.len(), 1);

    assert!(service.get("Foo").unwrap().is_none());
    assert!(service.get_by_id(id).unwrap().is_none());
    assert_eq!(service.attributed_objects("Foo").unwrap(), vec![sample]);
    let after = objects.resolve(sample).unwrap().unwrap();
    assert!(after.campaigns.contains("Foo"));
    assert_eq!(after.relationships.len(), 1);

    let err = service.remove("Foo", "bob").unwrap_err();
    assert!(matches!(err, CampaignServiceError::NotFound(_)));
}
