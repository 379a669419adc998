//! End-to-end unit-of-work scenarios
//!
//! Drives the aggregator the way a change-tracking engine would and checks
//! the records that reach storage.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Map, Value};

use entity_audit::{
    Action, AuditConfig, AuditableEntity, ChangeAggregator, ClassMetadata, EntityHandle,
    EntityRef, FieldValue, FixedActor, JsonlStore, LogRecord, MemorySink, MemoryStore,
    MetadataRegistry, MetadataResolver, MetadataSource, NoActor, PropertyDiff, PropertyMetadata,
    RecordBuilder, RecordStore, Strategy,
};

/// Minimal entity driven by the tests
struct TestEntity {
    handle: u64,
    class: String,
    id: Vec<String>,
    owner: Option<String>,
    delete_dump: Option<Map<String, Value>>,
    snapshot: Value,
}

impl TestEntity {
    fn new(handle: u64, class: &str, id: &str) -> Self {
        Self {
            handle,
            class: class.to_string(),
            id: vec![id.to_string()],
            owner: None,
            delete_dump: None,
            snapshot: json!({}),
        }
    }
}

impl AuditableEntity for TestEntity {
    fn handle(&self) -> EntityHandle {
        EntityHandle(self.handle)
    }

    fn runtime_class(&self) -> &str {
        &self.class
    }

    fn identifier(&self) -> Vec<String> {
        self.id.clone()
    }

    fn owner_identifier(&self) -> Option<String> {
        self.owner.clone()
    }

    fn dump_on_delete(&self) -> Option<Map<String, Value>> {
        self.delete_dump.clone()
    }

    fn snapshot(&self) -> Value {
        self.snapshot.clone()
    }
}

fn registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    registry.register(
        "app::Invoice",
        ClassMetadata::new(Strategy::IncludeAll)
            .with_label("Invoice")
            .property("updated_at", PropertyMetadata::ignored()),
    );
    registry.register(
        "app::Post",
        ClassMetadata::new(Strategy::IncludeAll)
            .property("tags", PropertyMetadata::default().with_expression("obj.name"))
            .property("drafts", PropertyMetadata::excluded()),
    );
    registry.register(
        "app::Article",
        ClassMetadata::new(Strategy::IncludeAll).with_on_delete_expression("obj.title"),
    );
    registry
}

fn aggregator_with(
    config: AuditConfig,
    registry: MetadataRegistry,
) -> (ChangeAggregator, Rc<RefCell<Vec<LogRecord>>>) {
    let store = MemoryStore::new();
    let records = store.records();
    let aggregator = ChangeAggregator::new(
        config,
        MetadataResolver::new(Box::new(registry)),
        RecordBuilder::new(Box::new(FixedActor("alice".into()))),
        Box::new(store),
        Box::new(MemorySink::new()),
    );
    (aggregator, records)
}

fn tag(id: &str, name: &str) -> FieldValue {
    FieldValue::Entity(EntityRef::new(
        "app::Tag",
        Some(id.to_string()),
        json!({"name": name}),
    ))
}

#[test]
fn update_filters_ignored_properties() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let invoice = TestEntity::new(1, "app::Invoice", "42");

    let mut diff = PropertyDiff::new();
    diff.insert(
        "status".into(),
        (FieldValue::from("DRAFT"), FieldValue::from("SENT")),
    );
    diff.insert(
        "updated_at".into(),
        (FieldValue::from("2024-01-01"), FieldValue::from("2024-01-02")),
    );

    agg.entity_updated(&invoice, &diff);
    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);

    let records = records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, Action::Update);
    assert_eq!(records[0].object_class, "app::Invoice");
    assert_eq!(records[0].instance_id, "42");
    assert_eq!(records[0].label.as_deref(), Some("Invoice"));
    assert_eq!(records[0].changed_by.as_deref(), Some("alice"));
    assert_eq!(
        records[0].changes,
        Some(json!({"status": ["DRAFT", "SENT"]}))
    );
}

#[test]
fn globally_ignored_properties_filtered_before_metadata() {
    let config = AuditConfig {
        ignored_properties: vec!["status".into()],
        ..AuditConfig::default()
    };
    let (mut agg, records) = aggregator_with(config, registry());
    let invoice = TestEntity::new(1, "app::Invoice", "42");

    let mut diff = PropertyDiff::new();
    diff.insert(
        "status".into(),
        (FieldValue::from("DRAFT"), FieldValue::from("SENT")),
    );

    agg.entity_updated(&invoice, &diff);
    assert_eq!(agg.unit_of_work_complete().unwrap(), 0);
    assert!(records.borrow().is_empty());
}

#[test]
fn collection_change_projects_membership() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let post = TestEntity::new(7, "app::Post", "7");

    let old = vec![tag("1", "a"), tag("2", "b")];
    let new = vec![tag("2", "b"), tag("3", "c")];
    agg.collection_changed(&post, "tags", &old, &new);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);
    let records = records.borrow();
    assert_eq!(
        records[0].changes,
        Some(json!({
            "tags": {
                "insertions": ["c"],
                "deletions": ["a"],
                "newSet": ["b", "c"]
            }
        }))
    );
    assert_eq!(records[0].action, Action::Update);
}

#[test]
fn unchanged_collection_produces_nothing() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let post = TestEntity::new(7, "app::Post", "7");

    let members = vec![tag("1", "a"), tag("2", "b")];
    agg.collection_changed(&post, "tags", &members, &members);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 0);
    assert!(records.borrow().is_empty());
}

#[test]
fn excluded_collection_field_skips_event() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let post = TestEntity::new(7, "app::Post", "7");

    agg.collection_changed(&post, "drafts", &[], &[tag("1", "a")]);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 0);
    assert!(records.borrow().is_empty());
}

#[test]
fn scalar_and_collection_changes_merge_into_one_record() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let post = TestEntity::new(7, "app::Post", "7");

    let mut diff = PropertyDiff::new();
    diff.insert(
        "title".into(),
        (FieldValue::from("Old"), FieldValue::from("New")),
    );
    agg.entity_updated(&post, &diff);
    agg.collection_changed(&post, "tags", &[tag("1", "a")], &[tag("2", "b")]);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);
    let records = records.borrow();
    let changes = records[0].changes.as_ref().unwrap();

    // Union of both contributions in a single record
    assert_eq!(changes["title"], json!(["Old", "New"]));
    assert_eq!(changes["tags"]["insertions"], json!(["b"]));
    assert_eq!(changes["tags"]["deletions"], json!(["a"]));
}

#[test]
fn remove_uses_delete_snapshot_capability() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let mut article = TestEntity::new(3, "app::Article", "9");
    let mut dump = Map::new();
    dump.insert("title".into(), json!("X"));
    article.delete_dump = Some(dump);

    agg.entity_removed(&article);
    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);

    let records = records.borrow();
    assert_eq!(records[0].action, Action::Remove);
    assert_eq!(records[0].changes, Some(json!({"_remove": {"title": "X"}})));
}

#[test]
fn remove_falls_back_to_on_delete_expression() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let mut article = TestEntity::new(3, "app::Article", "9");
    article.snapshot = json!({"title": "Farewell"});

    agg.entity_removed(&article);
    agg.unit_of_work_complete().unwrap();

    let records = records.borrow();
    assert_eq!(records[0].changes, Some(json!({"_remove": "Farewell"})));
}

#[test]
fn create_records_once_per_unit_of_work() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let invoice = TestEntity::new(1, "app::Invoice", "42");

    agg.entity_created(&invoice);
    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);
    assert_eq!(records.borrow().len(), 1);
    assert_eq!(records.borrow()[0].action, Action::Create);

    // A fresh unit of work starts from an empty pending set
    assert_eq!(agg.unit_of_work_complete().unwrap(), 0);
    assert_eq!(records.borrow().len(), 1);
}

#[test]
fn distinct_instances_get_distinct_records() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    // Same class and identifier, different in-memory instances
    let first = TestEntity::new(1, "app::Invoice", "42");
    let second = TestEntity::new(2, "app::Invoice", "42");

    agg.entity_created(&first);
    agg.entity_created(&second);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 2);
    assert_eq!(records.borrow().len(), 2);
}

#[test]
fn owner_identifier_is_recorded() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let mut invoice = TestEntity::new(1, "app::Invoice", "42");
    invoice.owner = Some("tenant-4".into());

    agg.entity_created(&invoice);
    agg.unit_of_work_complete().unwrap();

    assert_eq!(records.borrow()[0].instance_owner.as_deref(), Some("tenant-4"));
}

#[test]
fn proxy_wrapped_entity_resolves_declared_class() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let invoice = TestEntity::new(1, "proxies::__cg__::app::Invoice", "42");

    agg.entity_created(&invoice);
    agg.unit_of_work_complete().unwrap();

    let records = records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].object_class, "app::Invoice");
}

#[test]
fn disabled_pipeline_registers_nothing_and_records_nothing() {
    let (mut agg, records) = aggregator_with(AuditConfig::disabled(), registry());

    assert!(agg.subscribed_events().is_empty());

    let invoice = TestEntity::new(1, "app::Invoice", "42");
    agg.entity_created(&invoice);
    let mut diff = PropertyDiff::new();
    diff.insert(
        "status".into(),
        (FieldValue::from("a"), FieldValue::from("b")),
    );
    agg.entity_updated(&invoice, &diff);
    agg.entity_removed(&invoice);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 0);
    assert!(records.borrow().is_empty());
}

#[test]
fn one_entity_failure_never_blocks_siblings() {
    // A metadata source that fails for one class only
    struct FlakySource {
        inner: MetadataRegistry,
    }

    impl entity_audit::MetadataSource for FlakySource {
        fn class_metadata(
            &self,
            class: &str,
        ) -> entity_audit::AuditResult<Option<ClassMetadata>> {
            if class == "app::Broken" {
                return Err(entity_audit::AuditError::Metadata(
                    "lookup failed".into(),
                ));
            }
            self.inner.class_metadata(class)
        }
    }

    let store = MemoryStore::new();
    let records = store.records();
    let sink = MemorySink::new();
    let messages = sink.messages();
    let mut agg = ChangeAggregator::new(
        AuditConfig::default(),
        MetadataResolver::new(Box::new(FlakySource { inner: registry() })),
        RecordBuilder::new(Box::new(NoActor)),
        Box::new(store),
        Box::new(sink),
    );

    let broken = TestEntity::new(1, "app::Broken", "1");
    let invoice = TestEntity::new(2, "app::Invoice", "42");

    agg.entity_created(&broken);
    agg.entity_created(&invoice);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);
    assert_eq!(records.borrow().len(), 1);
    assert_eq!(records.borrow()[0].instance_id, "42");
    // The contained failure was reported
    assert_eq!(messages.borrow().len(), 1);
}

#[test]
fn create_then_remove_keeps_the_first_captured_action() {
    let (mut agg, records) = aggregator_with(AuditConfig::default(), registry());
    let mut article = TestEntity::new(3, "app::Article", "9");
    let mut dump = Map::new();
    dump.insert("title".into(), json!("X"));
    article.delete_dump = Some(dump);

    agg.entity_created(&article);
    agg.entity_removed(&article);

    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);
    let records = records.borrow();

    // One record per instance; the first capture fixes the action, and the
    // delete payload still merges into its change set
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, Action::Create);
    assert_eq!(records[0].changes, Some(json!({"_remove": {"title": "X"}})));
}

#[test]
fn failed_append_never_blocks_later_records() {
    // A store that rejects the first append and accepts the rest
    struct FailingFirstStore {
        inner: MemoryStore,
        attempts: usize,
    }

    impl RecordStore for FailingFirstStore {
        fn append(&mut self, record: &LogRecord) -> entity_audit::AuditResult<()> {
            self.attempts += 1;
            if self.attempts == 1 {
                return Err(entity_audit::AuditError::Storage("disk full".into()));
            }
            self.inner.append(record)
        }
    }

    let inner = MemoryStore::new();
    let records = inner.records();
    let sink = MemorySink::new();
    let messages = sink.messages();
    let mut agg = ChangeAggregator::new(
        AuditConfig::default(),
        MetadataResolver::new(Box::new(registry())),
        RecordBuilder::new(Box::new(NoActor)),
        Box::new(FailingFirstStore { inner, attempts: 0 }),
        Box::new(sink),
    );

    agg.entity_created(&TestEntity::new(1, "app::Invoice", "1"));
    agg.entity_created(&TestEntity::new(2, "app::Invoice", "2"));

    // The batch is surfaced as a storage error after every record was tried
    let err = agg.unit_of_work_complete().unwrap_err();
    assert!(err.is_storage());
    assert!(err.to_string().contains("1 of 2"));

    // The second record still reached storage, the failure was reported,
    // and nothing replays into the next unit of work
    assert_eq!(records.borrow().len(), 1);
    assert_eq!(records.borrow()[0].instance_id, "2");
    assert_eq!(messages.borrow().len(), 1);
    assert_eq!(agg.pending_count(), 0);
    assert_eq!(agg.unit_of_work_complete().unwrap(), 0);
}

#[test]
fn flush_writes_jsonl_records() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("changes.log");

    let mut agg = ChangeAggregator::new(
        AuditConfig::default(),
        MetadataResolver::new(Box::new(registry())),
        RecordBuilder::new(Box::new(NoActor)),
        Box::new(JsonlStore::new(path.clone())),
        Box::new(MemorySink::new()),
    );

    let invoice = TestEntity::new(1, "app::Invoice", "42");
    let mut diff = PropertyDiff::new();
    diff.insert(
        "status".into(),
        (FieldValue::from("DRAFT"), FieldValue::from("SENT")),
    );
    agg.entity_updated(&invoice, &diff);
    assert_eq!(agg.unit_of_work_complete().unwrap(), 1);

    let readback = JsonlStore::new(path);
    let records = readback.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].changes, Some(json!({"status": ["DRAFT", "SENT"]})));
}
