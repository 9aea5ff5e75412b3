use dashstate_core::{
    ChatThread, CollectionAction, CollectionError, CollectionFeature, CollectionItem,
    CollectionStore, FeedPost, ItemId, MailMessage, Notice, NoticeKind, NoticeQueue, Record,
    ReduceOutcome, SortDirection,
};
use std::sync::{Arc, Mutex};

fn thread(id: i64, title: &str, last_message_at: i64) -> ChatThread {
    ChatThread {
        id: ItemId::Int(id),
        title: title.to_string(),
        participants: vec!["ops".to_string()],
        last_message_at,
        unread_count: 0,
    }
}

#[test]
fn duplicate_add_raises_exactly_one_notice_and_keeps_state() {
    let queue = Arc::new(NoticeQueue::new());
    let mut store = CollectionStore::with_sink(CollectionFeature::FeedItems, queue.clone());
    store
        .reset(vec![Record::with_id(1), Record::with_id(2)])
        .expect("seed is valid");
    let before = store.snapshot();

    let outcome = store.add(Record::with_id(1).set("name", "dup"));

    assert_eq!(outcome, ReduceOutcome::Duplicate(ItemId::Int(1)));
    assert!(store.snapshot().ptr_eq(&before));
    let notices = queue.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].feature, CollectionFeature::FeedItems);
    assert_eq!(
        notices[0].kind,
        NoticeKind::Duplicate {
            id: ItemId::Int(1)
        }
    );
}

#[test]
fn successful_and_invalid_dispatches_raise_no_notice() {
    let seen = Arc::new(Mutex::new(Vec::<Notice>::new()));
    let sink = {
        let seen = seen.clone();
        move |notice: Notice| seen.lock().expect("notice lock").push(notice)
    };
    let mut store = CollectionStore::with_sink(CollectionFeature::MailList, Arc::new(sink));

    assert_eq!(store.add(Record::with_id(10)), ReduceOutcome::Changed);
    assert!(!store.remove(99).is_changed());
    assert!(!store
        .dispatch(CollectionAction::Remove { id: None })
        .is_changed());

    assert!(seen.lock().expect("notice lock").is_empty());
    assert_eq!(store.items().len(), 1);
}

#[test]
fn reset_rejects_seed_with_duplicate_ids() {
    let mut store: CollectionStore<Record> = CollectionStore::new(CollectionFeature::ChatMessages);
    store.add(Record::with_id(1));

    let err = store
        .reset(vec![Record::with_id(7), Record::with_id(7)])
        .expect_err("duplicate seed must fail");

    assert_eq!(err, CollectionError::DuplicateId(ItemId::Int(7)));
    assert_eq!(store.items().len(), 1);
}

#[test]
fn touch_thread_moves_most_recent_conversation_to_top() {
    let mut store = CollectionStore::new(CollectionFeature::ChatThreads);
    store
        .reset(vec![
            thread(1, "infra", 300),
            thread(2, "billing", 200),
            thread(3, "support", 100),
        ])
        .expect("seed is valid");

    let outcome = store.touch_thread(thread(3, "support", 100), 900);

    assert_eq!(outcome, ReduceOutcome::Changed);
    let order: Vec<ItemId> = store
        .items()
        .iter()
        .filter_map(CollectionItem::item_id)
        .collect();
    assert_eq!(order, vec![ItemId::Int(3), ItemId::Int(1), ItemId::Int(2)]);
    assert_eq!(store.items()[0].last_message_at, 900);
}

#[test]
fn typed_feed_and_mail_items_sort_by_field_name() {
    let mut feed = CollectionStore::new(CollectionFeature::FeedItems);
    for (id, likes) in [(1, 5_u32), (2, 12), (3, 5)] {
        feed.add(FeedPost {
            id: ItemId::Int(id),
            author: "team".to_string(),
            body: String::new(),
            likes,
            posted_at: 0,
        });
    }
    assert_eq!(feed.sort("likes", SortDirection::Descending), ReduceOutcome::Changed);
    let likes: Vec<(ItemId, u32)> = feed
        .items()
        .iter()
        .map(|post| (post.id.clone(), post.likes))
        .collect();
    assert_eq!(
        likes,
        vec![
            (ItemId::Int(2), 12),
            (ItemId::Int(1), 5),
            (ItemId::Int(3), 5)
        ]
    );

    let mut mail = CollectionStore::new(CollectionFeature::MailList);
    for (id, starred) in [("a", false), ("b", true)] {
        mail.add(MailMessage {
            id: ItemId::from(id),
            from: "noreply@example.com".to_string(),
            subject: id.to_string(),
            received_at: 0,
            starred,
            read: false,
        });
    }
    mail.sort("starred", SortDirection::Descending);
    assert_eq!(mail.items()[0].id, ItemId::from("b"));
}
