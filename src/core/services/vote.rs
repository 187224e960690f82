use std::collections::HashMap;

use itertools::Itertools;
use log::info;
use uuid::Uuid;

use crate::core::models::option::Opt;
use crate::core::models::vote::{Ballot, PollOptionResult, Vote, VotePolicy};
use crate::core::ports::repository::{Manager, PollRead, PollWrite, TxStore};
use crate::core::services::poll::authorize;
use crate::error::Error;

fn option_not_in_poll() -> Error {
    Error::NotFound("Option does not exist for this poll.".into())
}

pub async fn cast_vote<M>(store: &M, policy: VotePolicy, poll_id: Uuid, voter_id: Uuid, Ballot { option_id }: Ballot) -> Result<Vote, Error>
where
    M: Manager,
{
    let mut tx = store.tx(poll_id).await?;
    authorize(&tx, voter_id)?;
    if tx.option(option_id).is_none() {
        return Err(option_not_in_poll());
    }
    match policy {
        VotePolicy::Multi if tx.has_vote(option_id, voter_id) => {
            return Err(Error::Conflict("You have already voted for this option.".into()));
        }
        VotePolicy::Single if tx.votes().iter().any(|v| v.voter_id == voter_id) => {
            return Err(Error::Conflict("You have already voted in this poll.".into()));
        }
        _ => {}
    }
    let vote = tx.insert_vote(option_id, voter_id);
    tx.commit().await?;
    info!("vote cast in poll {} for option {} by account {}", poll_id, option_id, voter_id);
    Ok(vote)
}

/// Removes the voter's vote for the option. Retracting a vote that does not exist is a no-op.
pub async fn retract_vote<M>(store: &M, poll_id: Uuid, voter_id: Uuid, Ballot { option_id }: Ballot) -> Result<(), Error>
where
    M: Manager,
{
    let mut tx = store.tx(poll_id).await?;
    authorize(&tx, voter_id)?;
    if tx.option(option_id).is_none() {
        return Err(option_not_in_poll());
    }
    match tx.delete_vote(option_id, voter_id) {
        Some(_) => {
            tx.commit().await?;
            info!("vote retracted in poll {} for option {} by account {}", poll_id, option_id, voter_id);
        }
        None => tx.rollback().await?,
    }
    Ok(())
}

/// Per-option tallies, most votes first; ties keep the order options were added in.
pub fn tally(options: &[Opt], votes: &[Vote]) -> Vec<PollOptionResult> {
    let mut voters: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for vote in votes {
        let ids = voters.entry(vote.option_id).or_default();
        if !ids.contains(&vote.voter_id) {
            ids.push(vote.voter_id);
        }
    }
    options
        .iter()
        .map(|opt| {
            let voter_ids = voters.remove(&opt.id).unwrap_or_default();
            PollOptionResult {
                option_id: opt.id,
                option_name: opt.name.clone(),
                vote_count: voter_ids.len(),
                voter_ids,
            }
        })
        .sorted_by(|a, b| b.vote_count.cmp(&a.vote_count))
        .collect()
}

pub async fn get_results<M>(store: &M, poll_id: Uuid, requester_id: Uuid) -> Result<Vec<PollOptionResult>, Error>
where
    M: Manager,
{
    let snapshot = store.snapshot(poll_id).await?;
    authorize(&snapshot, requester_id)?;
    Ok(tally(snapshot.options(), snapshot.votes()))
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use futures::future::join_all;

    use super::*;
    use crate::core::models::option::OptCreate;
    use crate::core::models::poll::{Create, Join, PollView};
    use crate::core::services::option::add_option;
    use crate::core::services::poll::{create_poll, get_poll, join_poll};
    use crate::impls::storage::memory::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        alice: Uuid,
        bob: Uuid,
        poll: PollView,
        pizza: Opt,
        tacos: Opt,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::default();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let poll = create_poll(&store, alice, Create { name: "Dinner".into() }).await.unwrap();
        join_poll(&store, bob, Join { invite_code: poll.invite_code.clone().unwrap() }).await.unwrap();
        let pizza = add_option(&store, poll.id, alice, OptCreate { name: "Pizza".into(), ..Default::default() }).await.unwrap();
        let tacos = add_option(&store, poll.id, alice, OptCreate { name: "Tacos".into(), ..Default::default() }).await.unwrap();
        Fixture { store, alice, bob, poll, pizza, tacos }
    }

    fn ballot(opt: &Opt) -> Ballot {
        Ballot { option_id: opt.id }
    }

    fn assert_consistent(results: &[PollOptionResult]) {
        for r in results {
            assert_eq!(r.vote_count, r.voter_ids.len());
        }
    }

    #[actix_web::test]
    async fn test_results_scenario() {
        let f = fixture().await;
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        let results = get_results(&f.store, f.poll.id, f.alice).await.unwrap();
        assert_eq!(
            results,
            vec![
                PollOptionResult {
                    option_id: f.pizza.id,
                    option_name: "Pizza".into(),
                    vote_count: 1,
                    voter_ids: vec![f.bob],
                },
                PollOptionResult {
                    option_id: f.tacos.id,
                    option_name: "Tacos".into(),
                    vote_count: 0,
                    voter_ids: vec![],
                },
            ]
        );
    }

    #[actix_web::test]
    async fn test_results_ordered_by_count() {
        let f = fixture().await;
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&f.tacos)).await.unwrap();
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.alice, ballot(&f.tacos)).await.unwrap();
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.alice, ballot(&f.pizza)).await.unwrap();
        let results = get_results(&f.store, f.poll.id, f.bob).await.unwrap();
        assert_eq!(results[0].option_id, f.tacos.id);
        assert_eq!(results[0].voter_ids, vec![f.bob, f.alice]);
        assert_eq!(results[1].option_id, f.pizza.id);
        assert_eq!(results.iter().map(|r| r.vote_count).sum::<usize>(), 3);
    }

    #[actix_web::test]
    async fn test_duplicate_vote_conflicts() {
        let f = fixture().await;
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        let err = cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        // a different option is fine under the multi-choice policy
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&f.tacos)).await.unwrap();
    }

    #[actix_web::test]
    async fn test_single_choice_policy() {
        let f = fixture().await;
        cast_vote(&f.store, VotePolicy::Single, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        let err = cast_vote(&f.store, VotePolicy::Single, f.poll.id, f.bob, ballot(&f.tacos)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        retract_vote(&f.store, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        cast_vote(&f.store, VotePolicy::Single, f.poll.id, f.bob, ballot(&f.tacos)).await.unwrap();
    }

    #[actix_web::test]
    async fn test_cast_then_retract_restores_count() {
        let f = fixture().await;
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.alice, ballot(&f.pizza)).await.unwrap();
        let before = get_results(&f.store, f.poll.id, f.alice).await.unwrap();
        cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        retract_vote(&f.store, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        let after = get_results(&f.store, f.poll.id, f.alice).await.unwrap();
        assert_eq!(before, after);
    }

    #[actix_web::test]
    async fn test_retract_missing_vote_is_noop() {
        let f = fixture().await;
        let before = get_poll(&f.store, f.poll.id, f.bob).await.unwrap();
        retract_vote(&f.store, f.poll.id, f.bob, ballot(&f.pizza)).await.unwrap();
        let after = get_poll(&f.store, f.poll.id, f.bob).await.unwrap();
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[actix_web::test]
    async fn test_vote_requires_membership_and_known_option() {
        let f = fixture().await;
        let stranger = Uuid::new_v4();
        assert!(matches!(cast_vote(&f.store, VotePolicy::Multi, f.poll.id, stranger, ballot(&f.pizza)).await, Err(Error::Forbidden(_))));
        assert!(matches!(retract_vote(&f.store, f.poll.id, stranger, ballot(&f.pizza)).await, Err(Error::Forbidden(_))));
        assert!(matches!(get_results(&f.store, f.poll.id, stranger).await, Err(Error::Forbidden(_))));
        let unknown = Ballot { option_id: Uuid::new_v4() };
        assert!(matches!(cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, unknown.clone()).await, Err(Error::NotFound(_))));
        assert!(matches!(retract_vote(&f.store, f.poll.id, f.bob, unknown).await, Err(Error::NotFound(_))));

        // an option of another poll is not an option of this one
        let other = create_poll(&f.store, f.bob, Create { name: "Lunch".into() }).await.unwrap();
        let sushi = add_option(&f.store, other.id, f.bob, OptCreate { name: "Sushi".into(), ..Default::default() }).await.unwrap();
        assert!(matches!(cast_vote(&f.store, VotePolicy::Multi, f.poll.id, f.bob, ballot(&sushi)).await, Err(Error::NotFound(_))));
    }

    #[actix_web::test]
    async fn test_concurrent_votes_stay_consistent() {
        let f = fixture().await;
        let mut voters = vec![f.alice, f.bob];
        for _ in 0..20 {
            let voter = Uuid::new_v4();
            join_poll(&f.store, voter, Join { invite_code: f.poll.invite_code.clone().unwrap() }).await.unwrap();
            voters.push(voter);
        }
        let casts = voters.iter().flat_map(|v| [(*v, f.pizza.id), (*v, f.tacos.id)]);
        let outcomes = join_all(casts.map(|(voter, option_id)| cast_vote(&f.store, VotePolicy::Multi, f.poll.id, voter, Ballot { option_id }))).await;
        assert!(outcomes.iter().all(|o| o.is_ok()));

        let retracts = voters.iter().step_by(2).map(|v| retract_vote(&f.store, f.poll.id, *v, ballot(&f.pizza)));
        let reads = (0..10).map(|_| get_results(&f.store, f.poll.id, f.alice));
        let (retracted, snapshots) = futures::join!(join_all(retracts), join_all(reads));
        assert!(retracted.iter().all(|r| r.is_ok()));
        for results in snapshots {
            assert_consistent(&results.unwrap());
        }

        let results = get_results(&f.store, f.poll.id, f.alice).await.unwrap();
        assert_consistent(&results);
        let total: usize = results.iter().map(|r| r.vote_count).sum();
        assert_eq!(total, voters.len() * 2 - (voters.len() + 1) / 2);
    }

    #[test]
    fn test_tally_ignores_unknown_options() {
        let poll_id = Uuid::new_v4();
        let opt = Opt {
            id: Uuid::new_v4(),
            poll_id,
            name: "Pizza".into(),
            added_by: Uuid::new_v4(),
            created_at: Utc::now(),
            restaurant_id: None,
            image_url: None,
            menu_url: None,
        };
        let voter = Uuid::new_v4();
        let votes = vec![
            Vote { poll_id, option_id: opt.id, voter_id: voter, cast_at: Utc::now() },
            Vote { poll_id, option_id: Uuid::new_v4(), voter_id: voter, cast_at: Utc::now() },
        ];
        let results = tally(&[opt.clone()], &votes);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].voter_ids, vec![voter]);
    }
}
