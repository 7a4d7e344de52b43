//! End-to-end behaviour of the forum data layer.

use forumdb::{Category, Config, Forum, ForumConfig, ForumError, Record, Reply, Topic};
use std::collections::BTreeSet;
use tempfile::tempdir;

fn category(forum: &Forum, name: &str) -> Category {
    let mut cat = forum.new_category().unwrap();
    cat.name = name.to_string();
    cat.creator = "admin".into();
    cat.save(forum).unwrap();
    cat
}

fn topic_in(forum: &Forum, cat: &Category, title: &str) -> Topic {
    let mut topic = forum.new_topic().unwrap();
    topic.title = title.to_string();
    topic.owner = "alice".into();
    topic.category = cat.id().to_string();
    topic.save(forum).unwrap();
    topic
}

fn reply_to(forum: &Forum, topic: &Topic, body: &str) -> Reply {
    let mut reply = topic.new_reply(forum).unwrap();
    reply.body = body.to_string();
    reply.owner = "bob".into();
    reply.save(forum).unwrap();
    reply
}

#[test]
fn general_category_scenario() {
    let forum = Forum::in_memory().unwrap();

    let cat1 = category(&forum, "General");
    let t1 = topic_in(&forum, &cat1, "Hello");

    let topics = forum.list_topics_of(cat1.id()).unwrap();
    assert_eq!(topics.keys().collect::<Vec<_>>(), [t1.id()]);
    assert_eq!(topics[t1.id()], t1);

    let cats = forum.list_categories().unwrap();
    assert_eq!(cats[cat1.id()].topics, [t1.id()]);
    assert_eq!(cats[cat1.id()].name, "General");

    let r1 = reply_to(&forum, &t1, "Welcome");
    let replies = forum.all_replies_of(t1.id()).unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[r1.id()], r1);
    assert_eq!(t1.replies(&forum).unwrap(), replies);
}

#[test]
fn topic_save_appends_to_category() {
    let forum = Forum::in_memory().unwrap();
    let cat = category(&forum, "News");
    let first = topic_in(&forum, &cat, "one");
    let second = topic_in(&forum, &cat, "two");

    let stored = forum.read_category(cat.id()).unwrap().unwrap();
    assert_eq!(stored.topics, [first.id(), second.id()]);

    // Saving again appends a duplicate entry.
    second.save(&forum).unwrap();
    let stored = forum.read_category(cat.id()).unwrap().unwrap();
    assert_eq!(stored.topics, [first.id(), second.id(), second.id()]);
}

#[test]
fn topic_with_missing_category_writes_nothing() {
    let forum = Forum::in_memory().unwrap();
    let cat = category(&forum, "Existing");
    let before = forum.store().committed_seq();

    let mut topic = forum.new_topic().unwrap();
    topic.category = "does-not-exist".into();
    let err = topic.save(&forum).unwrap_err();
    assert!(matches!(err, ForumError::CategoryNotFound { ref id } if id == "does-not-exist"));

    assert!(forum.list_all_topics().unwrap().is_empty());
    assert!(forum.read_category(cat.id()).unwrap().unwrap().topics.is_empty());
    assert_eq!(forum.store().committed_seq(), before);
}

#[test]
fn topic_without_category_needs_sentinel_category() {
    let forum = Forum::in_memory().unwrap();
    let topic = forum.new_topic().unwrap();

    assert!(matches!(
        topic.save(&forum),
        Err(ForumError::CategoryNotFound { ref id }) if id == "invalid"
    ));

    forum
        .facade()
        .write(Category::BUCKET, "invalid", &Category::default().encode().unwrap())
        .unwrap();
    topic.save(&forum).unwrap();

    let stored = forum.read_topic(topic.id()).unwrap();
    assert_eq!(stored.category, "invalid");
    assert_eq!(forum.list_topics_of("invalid").unwrap().len(), 1);
}

#[test]
fn topic_with_corrupt_category_writes_nothing() {
    let forum = Forum::in_memory().unwrap();
    forum
        .facade()
        .write(Category::BUCKET, "broken", b"\x01\x02\x03")
        .unwrap();

    let mut topic = forum.new_topic().unwrap();
    topic.category = "broken".into();
    assert!(topic.save(&forum).unwrap_err().is_corruption());
    assert!(matches!(
        forum.read_topic(topic.id()),
        Err(ForumError::TopicNotFound { .. })
    ));
}

#[test]
fn replies_are_filtered_by_topic() {
    let forum = Forum::in_memory().unwrap();
    let cat = category(&forum, "General");
    let a = topic_in(&forum, &cat, "a");
    let b = topic_in(&forum, &cat, "b");

    let a1 = reply_to(&forum, &a, "a1");
    let a2 = reply_to(&forum, &a, "a2");
    let b1 = reply_to(&forum, &b, "b1");

    let of_a: BTreeSet<_> = forum.all_replies_of(a.id()).unwrap().into_keys().collect();
    let of_b: BTreeSet<_> = forum.all_replies_of(b.id()).unwrap().into_keys().collect();
    assert_eq!(of_a, BTreeSet::from([a1.id().to_string(), a2.id().to_string()]));
    assert_eq!(of_b, BTreeSet::from([b1.id().to_string()]));
    assert_eq!(forum.list_all_replies().unwrap().len(), 3);
}

#[test]
fn topic_delete_does_not_cascade() {
    let forum = Forum::in_memory().unwrap();
    let cat = category(&forum, "General");
    let topic = topic_in(&forum, &cat, "doomed");
    let reply = reply_to(&forum, &topic, "still here");

    topic.delete(&forum).unwrap();

    assert!(matches!(
        forum.read_topic(topic.id()),
        Err(ForumError::TopicNotFound { .. })
    ));
    assert_eq!(
        forum.read_category(cat.id()).unwrap().unwrap().topics,
        [topic.id()]
    );
    assert_eq!(forum.read_reply(reply.id()).unwrap(), Some(reply.clone()));
    assert_eq!(forum.all_replies_of(topic.id()).unwrap().len(), 1);
    assert_eq!(forum.stale_topic_refs().unwrap().len(), 1);
}

#[test]
fn category_and_reply_delete() {
    let forum = Forum::in_memory().unwrap();
    let cat = category(&forum, "General");
    let topic = topic_in(&forum, &cat, "t");
    let reply = reply_to(&forum, &topic, "r");

    reply.delete(&forum).unwrap();
    assert_eq!(forum.read_reply(reply.id()).unwrap(), None);

    cat.delete(&forum).unwrap();
    assert_eq!(forum.read_category(cat.id()).unwrap(), None);
    assert_eq!(forum.list_topics_of(cat.id()).unwrap().len(), 1);
}

#[test]
fn forum_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("forum.db");

    let (cat, topic, reply) = {
        let forum = Forum::open(&path).unwrap();
        let cat = category(&forum, "General");
        let topic = topic_in(&forum, &cat, "persisted");
        let reply = reply_to(&forum, &topic, "me too");
        forum.close().unwrap();
        (cat, topic, reply)
    };

    let forum = Forum::open(&path).unwrap();
    assert_eq!(forum.read_topic(topic.id()).unwrap(), topic);
    assert_eq!(forum.read_reply(reply.id()).unwrap(), Some(reply));
    assert_eq!(
        forum.read_category(cat.id()).unwrap().unwrap().topics,
        [topic.id()]
    );
}

#[test]
fn closed_forum_rejects_writes() {
    let forum = Forum::in_memory().unwrap();
    let cat = forum.new_category().unwrap();
    forum.close().unwrap();
    assert!(matches!(
        cat.save(&forum),
        Err(ForumError::Core(forumdb::CoreError::StoreClosed))
    ));
}

#[test]
fn seeded_forums_generate_the_same_ids() {
    let config = ForumConfig::new().id_seed(42);
    let a = Forum::in_memory_with_config(config.clone()).unwrap();
    let b = Forum::in_memory_with_config(config).unwrap();

    assert_eq!(a.new_topic().unwrap().id(), b.new_topic().unwrap().id());
    assert_eq!(a.new_category().unwrap().id(), b.new_category().unwrap().id());
}

#[test]
fn open_existing_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.db");
    let config = ForumConfig::new().store(Config::new().create_if_missing(false));
    assert!(matches!(
        Forum::open_with_config(&path, config),
        Err(ForumError::Core(forumdb::CoreError::StoreNotFound { .. }))
    ));
}

#[test]
fn forum_is_shareable_across_threads() {
    use std::sync::Arc;
    use std::thread;

    let forum = Arc::new(Forum::in_memory().unwrap());
    let cat = category(&forum, "General");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let forum = Arc::clone(&forum);
            let cat = cat.clone();
            thread::spawn(move || {
                for j in 0..5 {
                    topic_in(&forum, &cat, &format!("{i}-{j}"));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stored = forum.read_category(cat.id()).unwrap().unwrap();
    assert_eq!(stored.topics.len(), 20);
    assert_eq!(forum.list_topics_of(cat.id()).unwrap().len(), 20);
}
