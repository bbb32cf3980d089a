//! # Gift Exchange Demo
//!
//! Posts a gift work in an exchange collection and shows every notice the
//! dispatcher fires: gift recipients, the author's subscriber, and the
//! fragment sweep once the exchange collection changes.

use anyhow::Result;
use herald_core::{
    fragment_key, ActingUser, Collection, CollectionSweeper, Creation, CreationId, CreationStore,
    Dispatcher, Fragment, PriorState, UserId,
};
use herald_testing::{
    pseud, ChannelQueue, MemoryCache, MemoryCollections, MemoryPreferences, MemoryStore,
    MemorySubscriptions, RecordingMailer, RosterBylines, WorkBuilder,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    // Cast and setting
    let author = pseud("stagewright");
    let alice = pseud("alice");
    let bob = pseud("bob");
    let follower = UserId::new();

    let exchange = Collection::new("midsummer-exchange");
    let work = WorkBuilder::new("Ode to Joy")
        .credited(&author)
        .recipients("alice, bob")
        .in_collection(exchange.id)
        .build();
    let work_id = work.id;

    let mut store = MemoryStore::new();
    store.insert(work);

    let mut subs = MemorySubscriptions::new();
    subs.follow_user(follower, author.user_id);

    // Subscription notices drain to a delivery worker
    let (queue, mut rx) = ChannelQueue::new();
    let worker = tokio::spawn(async move {
        while let Some(notice) = rx.recv().await {
            println!(
                "  [queue] subscription {} -> user {} about {}",
                notice.subscription, notice.subscriber, notice.creation
            );
        }
    });

    let mailer = RecordingMailer::new();
    let dispatcher = Dispatcher::new(
        mailer.clone(),
        queue,
        RosterBylines::new(vec![alice.clone(), bob.clone()]),
        MemoryPreferences::new(),
        subs,
    );
    let acting = ActingUser::new(author.user_id, vec![author.id]);

    // The draft flips to posted and saves for real
    println!("Posting {work_id}...");
    let prior = PriorState {
        posted: false,
        in_anon_collection: false,
        in_unrevealed_collection: false,
    };
    if let Some(Creation::Work(w)) = store.creation_mut(CreationId::Work(work_id)) {
        w.posted = true;
    }
    dispatcher.before_update(&mut store, CreationId::Work(work_id), &prior, &acting)?;
    dispatcher.after_save(&mut store, CreationId::Work(work_id))?;

    for notice in mailer.sent() {
        println!("  [mail] {notice:?}");
    }

    // The save also dirties the exchange collection's cached fragments
    let mut index = MemoryCollections::new();
    index.insert(exchange.clone());
    let cache = MemoryCache::new();
    cache.put(&fragment_key(Fragment::Blurb, exchange.id), "<blurb>");
    cache.put(&fragment_key(Fragment::Profile, exchange.id), "<profile>");

    let sweeper = CollectionSweeper::new(cache.clone());
    sweeper.after_save(store.get_work(work_id).expect("work just saved"), &index);
    println!(
        "Swept exchange fragments, {} cached entries remain",
        cache.len()
    );

    drop(dispatcher);
    worker.await?;
    println!("All notices delivered!");

    Ok(())
}
