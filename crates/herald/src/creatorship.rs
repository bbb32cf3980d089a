//! Creatorship reconciliation.
//!
//! After any save, a creation's persisted `pseuds` must equal its pending
//! `authors` list with pending removals applied. Reconciliation also
//! propagates credit one level across the work family: a chapter's new
//! author is credited on its work, a work's new author on its first
//! chapter and on every series containing the work. Propagation never
//! cascades further.

use tracing::trace;

use crate::creation::{ActingUser, Creation, Pseud};
use crate::error::NotifyError;
use crate::ids::{ChapterId, CreationId, SeriesId, WorkId};
use crate::store::CreationStore;

fn fetch<'a>(store: &'a dyn CreationStore, id: CreationId) -> Result<&'a Creation, NotifyError> {
    store.creation(id).ok_or(NotifyError::MissingCreation(id))
}

fn fetch_mut<'a>(
    store: &'a mut dyn CreationStore,
    id: CreationId,
) -> Result<&'a mut Creation, NotifyError> {
    store
        .creation_mut(id)
        .ok_or(NotifyError::MissingCreation(id))
}

/// Result of the co-author delta computation. `creation` is the entity
/// the notice should reference: chapters aggregate under their work for
/// authorship, so a chapter save reports the parent work here.
#[derive(Debug)]
pub struct CoAuthorDelta {
    pub creation: CreationId,
    pub new_authors: Vec<Pseud>,
}

/// Pseuds this save newly credits, excluding anything already persisted
/// and anything belonging to the acting user (you don't get mail about
/// your own edit). Deduplicated by pseud id: the author list is free text
/// upstream and may name the same pseud twice.
pub fn new_coauthors(
    store: &dyn CreationStore,
    id: CreationId,
    acting: &ActingUser,
) -> Result<CoAuthorDelta, NotifyError> {
    let creation = fetch(store, id)?;
    let creation = match creation {
        Creation::Chapter(chapter) => fetch(store, CreationId::Work(chapter.work_id))?,
        other => other,
    };

    let mut new_authors: Vec<Pseud> = Vec::new();
    for author in creation.authors() {
        if creation.pseuds().iter().any(|p| p.id == author.id) {
            continue;
        }
        if acting.owns_pseud(author.id) {
            continue;
        }
        if new_authors.iter().any(|p| p.id == author.id) {
            continue;
        }
        new_authors.push(author.clone());
    }
    Ok(CoAuthorDelta {
        creation: creation.id(),
        new_authors,
    })
}

/// Propagation targets for one creation, captured before mutation starts.
enum Family {
    Work {
        first_chapter: Option<ChapterId>,
        series: Vec<SeriesId>,
    },
    Chapter {
        work: WorkId,
    },
    Series,
}

impl Family {
    fn of(creation: &Creation) -> Self {
        match creation {
            Creation::Work(w) => Family::Work {
                first_chapter: w.first_chapter(),
                series: w.series.clone(),
            },
            Creation::Chapter(c) => Family::Chapter { work: c.work_id },
            Creation::Series(_) => Family::Series,
        }
    }
}

/// Bring the persisted creatorship in line with the pending author list.
///
/// Runs unconditionally on every save, whether or not any co-author
/// notice went out. Errors only when `id` (or a family member credit must
/// propagate to) is absent from the store, which is a programming error in
/// the calling code.
pub fn save_creatorships(store: &mut dyn CreationStore, id: CreationId) -> Result<(), NotifyError> {
    let (additions, removals, family) = {
        let creation = fetch(store, id)?;
        let mut additions: Vec<Pseud> = Vec::new();
        for author in creation.authors() {
            if creation.pseuds().iter().any(|p| p.id == author.id) {
                continue;
            }
            if additions.iter().any(|p| p.id == author.id) {
                continue;
            }
            additions.push(author.clone());
        }
        (
            additions,
            creation.authors_to_remove().to_vec(),
            Family::of(creation),
        )
    };

    for pseud in &additions {
        trace!(creation = %id, pseud = %pseud.id, "crediting pseud");
        fetch_mut(store, id)?.add_pseud(pseud.clone());
        match &family {
            Family::Chapter { work } => {
                fetch_mut(store, CreationId::Work(*work))?.add_pseud(pseud.clone());
            }
            Family::Work {
                first_chapter,
                series,
            } => {
                if let Some(chapter) = first_chapter {
                    fetch_mut(store, CreationId::Chapter(*chapter))?.add_pseud(pseud.clone());
                }
                for series_id in series {
                    fetch_mut(store, CreationId::Series(*series_id))?.add_pseud(pseud.clone());
                }
            }
            Family::Series => {}
        }
    }

    for pseud in &removals {
        trace!(creation = %id, pseud = %pseud.id, "removing pseud");
        fetch_mut(store, id)?.remove_pseud(pseud.id);
        if let Family::Work {
            first_chapter: Some(chapter),
            ..
        } = &family
        {
            fetch_mut(store, CreationId::Chapter(*chapter))?.remove_pseud(pseud.id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{chapter_of, pseud, series_with, work, Library};

    #[test]
    fn credits_pending_authors() {
        let alice = pseud("alice");
        let bob = pseud("bob");
        let mut w = work("Duet");
        w.pseuds = vec![alice.clone()];
        w.authors = vec![alice.clone(), bob.clone()];
        let id = w.id;
        let mut library = Library::new();
        library.insert(w);

        save_creatorships(&mut library, CreationId::Work(id)).unwrap();

        let pseuds = library.work(id).pseuds.clone();
        assert_eq!(pseuds.len(), 2);
        assert!(pseuds.iter().any(|p| p.id == bob.id));
    }

    #[test]
    fn work_credit_propagates_to_first_chapter_and_series() {
        let alice = pseud("alice");
        let bob = pseud("bob");
        let mut w = work("Duet");
        w.pseuds = vec![alice.clone()];
        w.authors = vec![alice.clone(), bob.clone()];
        let mut library = Library::new();
        let chapter = chapter_of(&mut w, 1, vec![alice.clone()]);
        let series = series_with("Songbook", &mut w, vec![alice.clone()]);
        let (work_id, chapter_id, series_id) = (w.id, chapter.id, series.id);
        library.insert(w);
        library.insert(chapter);
        library.insert(series);

        save_creatorships(&mut library, CreationId::Work(work_id)).unwrap();

        assert!(library.chapter(chapter_id).pseuds.iter().any(|p| p.id == bob.id));
        assert!(library.series(series_id).pseuds.iter().any(|p| p.id == bob.id));
        // one level only: nothing else changed
        assert_eq!(library.chapter(chapter_id).pseuds.len(), 2);
    }

    #[test]
    fn chapter_credit_propagates_to_work_only_once() {
        let alice = pseud("alice");
        let bob = pseud("bob");
        let mut w = work("Duet");
        w.pseuds = vec![alice.clone(), bob.clone()];
        let mut chapter = chapter_of(&mut w, 2, vec![alice.clone()]);
        chapter.authors = vec![alice.clone(), bob.clone()];
        let (work_id, chapter_id) = (w.id, chapter.id);
        let mut library = Library::new();
        library.insert(w);
        library.insert(chapter);

        save_creatorships(&mut library, CreationId::Chapter(chapter_id)).unwrap();

        assert!(library.chapter(chapter_id).pseuds.iter().any(|p| p.id == bob.id));
        // bob was already credited on the work; no duplicate row
        assert_eq!(library.work(work_id).pseuds.len(), 2);
    }

    #[test]
    fn removal_applies_to_work_and_first_chapter() {
        let alice = pseud("alice");
        let bob = pseud("bob");
        let mut w = work("Duet");
        w.pseuds = vec![alice.clone(), bob.clone()];
        w.authors = vec![alice.clone()];
        w.authors_to_remove = vec![bob.clone()];
        let chapter = chapter_of(&mut w, 1, vec![alice.clone(), bob.clone()]);
        let (work_id, chapter_id) = (w.id, chapter.id);
        let mut library = Library::new();
        library.insert(w);
        library.insert(chapter);

        save_creatorships(&mut library, CreationId::Work(work_id)).unwrap();

        assert!(!library.work(work_id).pseuds.iter().any(|p| p.id == bob.id));
        assert!(!library.chapter(chapter_id).pseuds.iter().any(|p| p.id == bob.id));
    }

    #[test]
    fn missing_creation_is_an_invariant_violation() {
        let mut library = Library::new();
        let id = CreationId::Work(crate::ids::WorkId::new());
        let err = save_creatorships(&mut library, id).unwrap_err();
        assert!(matches!(err, NotifyError::MissingCreation(_)));
    }

    #[test]
    fn new_coauthors_excludes_acting_user_and_duplicates() {
        let alice = pseud("alice");
        let bob = pseud("bob");
        let mut w = work("Duet");
        w.pseuds = vec![alice.clone()];
        w.authors = vec![alice.clone(), bob.clone(), bob.clone()];
        let id = w.id;
        let mut library = Library::new();
        library.insert(w);
        let acting = ActingUser::new(alice.user_id, vec![alice.id]);

        let delta = new_coauthors(&library, CreationId::Work(id), &acting).unwrap();

        assert_eq!(delta.creation, CreationId::Work(id));
        assert_eq!(delta.new_authors.len(), 1);
        assert_eq!(delta.new_authors[0].id, bob.id);
    }

    // Reconciliation invariant: after any save, pseuds == authors with
    // pending removals applied, regardless of the edit sequence.
    #[test]
    fn reconciliation_invariant_under_random_edits() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let roster: Vec<Pseud> = (0..8).map(|i| pseud(&format!("p{i}"))).collect();

        for _ in 0..200 {
            let mut persisted: Vec<Pseud> = roster
                .iter()
                .filter(|_| rng.bool())
                .cloned()
                .collect();
            rng.shuffle(&mut persisted);

            let mut authors: Vec<Pseud> = persisted.clone();
            // random additions, possibly repeated
            for _ in 0..rng.usize(0..4) {
                authors.push(roster[rng.usize(0..roster.len())].clone());
            }
            // random removals drawn from the persisted set
            let removals: Vec<Pseud> = persisted
                .iter()
                .filter(|_| rng.u8(0..4) == 0)
                .cloned()
                .collect();
            // a removed pseud is no longer in the pending author list
            authors.retain(|a| !removals.iter().any(|r| r.id == a.id));

            let mut w = work("Shuffle");
            w.pseuds = persisted;
            w.authors = authors.clone();
            w.authors_to_remove = removals.clone();
            let id = w.id;
            let mut library = Library::new();
            library.insert(w);

            save_creatorships(&mut library, CreationId::Work(id)).unwrap();

            let after = library.work(id).pseuds.clone();
            for author in &authors {
                assert!(after.iter().any(|p| p.id == author.id));
            }
            for gone in &removals {
                assert!(!after.iter().any(|p| p.id == gone.id));
            }
            // no duplicates and nothing outside the author list
            for (i, p) in after.iter().enumerate() {
                assert!(authors.iter().any(|a| a.id == p.id));
                assert!(!after[..i].iter().any(|q| q.id == p.id));
            }
        }
    }
}
