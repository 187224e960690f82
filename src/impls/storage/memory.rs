//! In-process repository.
//!
//! Each poll lives behind its own `tokio` read/write lock so that work on different polls never
//! contends. Mutations run against a private copy of the poll taken when the transaction starts;
//! `commit` swaps the copy in and updates the catalog without suspending, so a request that is
//! dropped half way leaves nothing behind.
//!
//! The catalog (poll registry, invite codes, per-account poll index) is guarded by a synchronous
//! lock that is never held across an `.await`. Lock order is always poll first, catalog second.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock as SyncRwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::timeout;
use uuid::Uuid;

use crate::core::models::{
    account::{normalize_email, Account, Insert as AccountInsert, Patch as AccountPatch},
    option::{Insert as OptInsert, Opt},
    poll::{Insert as PollInsert, Membership, Poll, Role},
    vote::Vote,
};
use crate::core::ports::repository::{AccountCommon, Manager, PollRead, PollWrite, TxStore};
use crate::error::Error;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
struct PollState {
    poll: Poll,
    members: Vec<Membership>,
    options: Vec<Opt>,
    votes: Vec<Vote>,
    deleted: bool,
}

impl PollState {
    // strictly after the previous change, even when the clock has not moved
    fn touch(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.poll.updated_at = if now > self.poll.updated_at {
            now
        } else {
            self.poll.updated_at + chrono::Duration::microseconds(1)
        };
        self.poll.updated_at
    }
}

#[derive(Default)]
struct Catalog {
    polls: HashMap<Uuid, Arc<RwLock<PollState>>>,
    invite_codes: HashMap<String, Uuid>,
    account_polls: HashMap<Uuid, HashSet<Uuid>>,
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
}

fn read_catalog(catalog: &SyncRwLock<Catalog>) -> Result<RwLockReadGuard<'_, Catalog>, Error> {
    catalog.read().map_err(|_| Error::ServerError("poll catalog lock poisoned".into()))
}

fn write_catalog(catalog: &SyncRwLock<Catalog>) -> Result<RwLockWriteGuard<'_, Catalog>, Error> {
    catalog.write().map_err(|_| Error::ServerError("poll catalog lock poisoned".into()))
}

fn poll_not_found() -> Error {
    Error::NotFound("Poll not found.".into())
}

fn poll_busy() -> Error {
    Error::Unavailable("The poll is busy, please try again.".into())
}

fn email_taken() -> Error {
    Error::Conflict("User with this email already exists.".into())
}

pub struct MemoryStore {
    accounts: RwLock<Accounts>,
    catalog: Arc<SyncRwLock<Catalog>>,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            accounts: RwLock::new(Accounts::default()),
            catalog: Arc::new(SyncRwLock::new(Catalog::default())),
            lock_timeout,
        }
    }

    fn lookup(&self, poll_id: Uuid) -> Result<Arc<RwLock<PollState>>, Error> {
        read_catalog(&self.catalog)?.polls.get(&poll_id).cloned().ok_or_else(poll_not_found)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl AccountCommon for MemoryStore {
    async fn insert(&self, account: AccountInsert) -> Result<Account, Error> {
        let mut accounts = self.accounts.write().await;
        let key = normalize_email(&account.email);
        if accounts.by_email.contains_key(&key) {
            return Err(email_taken());
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            salt: account.salt,
            created_at: now,
            updated_at: now,
        };
        accounts.by_email.insert(key, account.id);
        accounts.by_id.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Account>, Error> {
        Ok(self.accounts.read().await.by_id.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let accounts = self.accounts.read().await;
        Ok(accounts.by_email.get(&normalize_email(email)).and_then(|id| accounts.by_id.get(id)).cloned())
    }

    async fn patch(&self, id: Uuid, patch: AccountPatch) -> Result<Account, Error> {
        let mut accounts = self.accounts.write().await;
        let Accounts { by_id, by_email } = &mut *accounts;
        let account = by_id.get_mut(&id).ok_or_else(|| Error::NotFound("Account not found.".into()))?;
        if let Some(email) = patch.email {
            let (old_key, new_key) = (account.email_key(), normalize_email(&email));
            if old_key != new_key {
                if by_email.contains_key(&new_key) {
                    return Err(email_taken());
                }
                by_email.remove(&old_key);
                by_email.insert(new_key, id);
            }
            account.email = email;
        }
        if let Some(name) = patch.name {
            account.name = name;
        }
        if let (Some(hash), Some(salt)) = (patch.password_hash, patch.salt) {
            account.password_hash = hash;
            account.salt = salt;
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }
}

pub struct MemorySnapshot {
    guard: OwnedRwLockReadGuard<PollState>,
}

impl PollRead for MemorySnapshot {
    fn poll(&self) -> &Poll {
        &self.guard.poll
    }

    fn members(&self) -> &[Membership] {
        &self.guard.members
    }

    fn options(&self) -> &[Opt] {
        &self.guard.options
    }

    fn votes(&self) -> &[Vote] {
        &self.guard.votes
    }
}

pub struct MemoryTx {
    guard: OwnedRwLockWriteGuard<PollState>,
    draft: PollState,
    catalog: Arc<SyncRwLock<Catalog>>,
}

impl PollRead for MemoryTx {
    fn poll(&self) -> &Poll {
        &self.draft.poll
    }

    fn members(&self) -> &[Membership] {
        &self.draft.members
    }

    fn options(&self) -> &[Opt] {
        &self.draft.options
    }

    fn votes(&self) -> &[Vote] {
        &self.draft.votes
    }
}

impl PollWrite for MemoryTx {
    fn add_member(&mut self, account_id: Uuid, role: Role) -> Membership {
        let joined_at = self.draft.touch();
        let membership = Membership { account_id, role, joined_at };
        self.draft.members.push(membership.clone());
        membership
    }

    fn insert_option(&mut self, option: OptInsert) -> Opt {
        let created_at = self.draft.touch();
        let opt = Opt {
            id: Uuid::new_v4(),
            poll_id: self.draft.poll.id,
            name: option.name,
            added_by: option.added_by,
            created_at,
            restaurant_id: option.restaurant_id,
            image_url: option.image_url,
            menu_url: option.menu_url,
        };
        self.draft.options.push(opt.clone());
        opt
    }

    fn insert_vote(&mut self, option_id: Uuid, voter_id: Uuid) -> Vote {
        let cast_at = self.draft.touch();
        let vote = Vote {
            poll_id: self.draft.poll.id,
            option_id,
            voter_id,
            cast_at,
        };
        self.draft.votes.push(vote.clone());
        vote
    }

    fn delete_vote(&mut self, option_id: Uuid, voter_id: Uuid) -> Option<Vote> {
        let idx = self.draft.votes.iter().position(|v| v.option_id == option_id && v.voter_id == voter_id)?;
        let vote = self.draft.votes.remove(idx);
        self.draft.touch();
        Some(vote)
    }

    fn rename(&mut self, name: String) {
        self.draft.poll.name = name;
        self.draft.touch();
    }

    fn delete(&mut self) {
        self.draft.deleted = true;
    }
}

impl TxStore for MemoryTx {
    async fn commit(self) -> Result<(), Error> {
        let MemoryTx { mut guard, draft, catalog } = self;
        let poll_id = draft.poll.id;
        {
            let mut catalog = write_catalog(&catalog)?;
            if draft.deleted {
                catalog.polls.remove(&poll_id);
                catalog.invite_codes.remove(&draft.poll.invite_code);
                for m in &draft.members {
                    if let Some(polls) = catalog.account_polls.get_mut(&m.account_id) {
                        polls.remove(&poll_id);
                    }
                }
            } else {
                for m in &draft.members {
                    catalog.account_polls.entry(m.account_id).or_default().insert(poll_id);
                }
            }
        }
        *guard = draft;
        debug!("poll {} committed", poll_id);
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        debug!("poll {} rolled back", self.draft.poll.id);
        Ok(())
    }
}

impl Manager for MemoryStore {
    type Snapshot = MemorySnapshot;
    type Tx = MemoryTx;

    async fn create_poll<I>(&self, poll: PollInsert, invite_codes: I) -> Result<(Poll, Membership), Error>
    where
        I: IntoIterator<Item = String>,
    {
        let mut catalog = write_catalog(&self.catalog)?;
        let invite_code = invite_codes
            .into_iter()
            .find(|code| !catalog.invite_codes.contains_key(code))
            .ok_or_else(|| Error::Conflict("Could not allocate a unique invite code, please try again.".into()))?;
        let now = Utc::now();
        let poll = Poll {
            id: Uuid::new_v4(),
            name: poll.name,
            invite_code,
            created_by: poll.created_by,
            created_at: now,
            updated_at: now,
        };
        let owner = Membership {
            account_id: poll.created_by,
            role: Role::Owner,
            joined_at: now,
        };
        let state = PollState {
            poll: poll.clone(),
            members: vec![owner.clone()],
            options: Vec::new(),
            votes: Vec::new(),
            deleted: false,
        };
        catalog.invite_codes.insert(poll.invite_code.clone(), poll.id);
        catalog.account_polls.entry(poll.created_by).or_default().insert(poll.id);
        catalog.polls.insert(poll.id, Arc::new(RwLock::new(state)));
        Ok((poll, owner))
    }

    async fn find_by_invite_code(&self, invite_code: &str) -> Result<Option<Uuid>, Error> {
        Ok(read_catalog(&self.catalog)?.invite_codes.get(invite_code).copied())
    }

    async fn polls_of(&self, account_id: Uuid) -> Result<Vec<Uuid>, Error> {
        let catalog = read_catalog(&self.catalog)?;
        Ok(catalog.account_polls.get(&account_id).map(|polls| polls.iter().copied().collect()).unwrap_or_default())
    }

    async fn snapshot(&self, poll_id: Uuid) -> Result<MemorySnapshot, Error> {
        let lock = self.lookup(poll_id)?;
        let guard = timeout(self.lock_timeout, lock.read_owned()).await.map_err(|_| poll_busy())?;
        if guard.deleted {
            return Err(poll_not_found());
        }
        Ok(MemorySnapshot { guard })
    }

    async fn tx(&self, poll_id: Uuid) -> Result<MemoryTx, Error> {
        let lock = self.lookup(poll_id)?;
        let guard = timeout(self.lock_timeout, lock.write_owned()).await.map_err(|_| poll_busy())?;
        if guard.deleted {
            return Err(poll_not_found());
        }
        let draft = guard.clone();
        Ok(MemoryTx {
            guard,
            draft,
            catalog: self.catalog.clone(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn insert(email: &str) -> AccountInsert {
        AccountInsert {
            name: "Alice".into(),
            email: email.into(),
            password_hash: "hash".into(),
            salt: "salt".into(),
        }
    }

    fn new_poll(owner: Uuid) -> PollInsert {
        PollInsert { name: "Dinner".into(), created_by: owner }
    }

    #[actix_web::test]
    async fn test_account_email_index() {
        let store = MemoryStore::default();
        let account = AccountCommon::insert(&store, insert("Alice@X.com")).await.unwrap();
        assert_eq!(AccountCommon::get_by_email(&store, "alice@x.COM").await.unwrap().map(|a| a.id), Some(account.id));
        assert!(matches!(AccountCommon::insert(&store, insert("alice@x.com")).await, Err(Error::Conflict(_))));

        let patched = AccountCommon::patch(&store, account.id, AccountPatch { email: Some("new@x.com".into()), ..Default::default() }).await.unwrap();
        assert_eq!(patched.email, "new@x.com");
        assert!(AccountCommon::get_by_email(&store, "alice@x.com").await.unwrap().is_none());
        // the old address is free again
        assert!(AccountCommon::insert(&store, insert("alice@x.com")).await.is_ok());
        assert!(matches!(AccountCommon::patch(&store, Uuid::new_v4(), AccountPatch::default()).await, Err(Error::NotFound(_))));
    }

    #[actix_web::test]
    async fn test_create_poll_skips_taken_codes() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let (first, _) = store.create_poll(new_poll(owner), vec!["AAAA2222".to_owned()]).await.unwrap();
        let (second, _) = store.create_poll(new_poll(owner), vec!["AAAA2222".to_owned(), "BBBB3333".to_owned()]).await.unwrap();
        assert_eq!(first.invite_code, "AAAA2222");
        assert_eq!(second.invite_code, "BBBB3333");
        let err = store.create_poll(new_poll(owner), vec!["AAAA2222".to_owned(), "BBBB3333".to_owned()]).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.polls_of(owner).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_commit_publishes_draft() {
        let store = MemoryStore::default();
        let (owner, member) = (Uuid::new_v4(), Uuid::new_v4());
        let (poll, _) = store.create_poll(new_poll(owner), vec!["CODE2345".to_owned()]).await.unwrap();

        let mut tx = store.tx(poll.id).await.unwrap();
        tx.add_member(member, Role::Member);
        assert!(store.polls_of(member).await.unwrap().is_empty());
        tx.commit().await.unwrap();

        assert_eq!(store.polls_of(member).await.unwrap(), vec![poll.id]);
        let snapshot = store.snapshot(poll.id).await.unwrap();
        assert_eq!(snapshot.role_of(member), Some(Role::Member));
        assert!(snapshot.poll().updated_at > poll.updated_at);
    }

    #[actix_web::test]
    async fn test_writer_waits_for_readers() {
        let store = MemoryStore::new(Duration::from_millis(10));
        let owner = Uuid::new_v4();
        let (poll, _) = store.create_poll(new_poll(owner), vec!["CODE2345".to_owned()]).await.unwrap();
        let reader = store.snapshot(poll.id).await.unwrap();
        // readers share, writers wait
        assert!(store.snapshot(poll.id).await.is_ok());
        assert!(matches!(store.tx(poll.id).await, Err(Error::Unavailable(_))));
        drop(reader);
        assert!(store.tx(poll.id).await.is_ok());
    }

    #[actix_web::test]
    async fn test_delete_frees_code_and_index() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let (poll, _) = store.create_poll(new_poll(owner), vec!["CODE2345".to_owned()]).await.unwrap();
        let mut tx = store.tx(poll.id).await.unwrap();
        tx.delete();
        tx.commit().await.unwrap();

        assert!(store.find_by_invite_code("CODE2345").await.unwrap().is_none());
        assert!(store.polls_of(owner).await.unwrap().is_empty());
        assert!(matches!(store.snapshot(poll.id).await, Err(Error::NotFound(_))));
        assert!(store.create_poll(new_poll(owner), vec!["CODE2345".to_owned()]).await.is_ok());
    }
}
