use uuid::Uuid;

use crate::core::models::{
    account::{Account, Insert as AccountInsert, Patch as AccountPatch},
    option::{Insert as OptInsert, Opt},
    poll::{Insert as PollInsert, Membership, Poll, Role},
    vote::Vote,
};
use crate::error::Error;

pub trait AccountCommon {
    /// Fails with `Conflict` when the email is already taken (case-insensitive).
    async fn insert(&self, account: AccountInsert) -> Result<Account, Error>;
    async fn get(&self, id: Uuid) -> Result<Option<Account>, Error>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, Error>;
    /// Fails with `NotFound` for an unknown account and `Conflict` when the new email belongs to another account.
    async fn patch(&self, id: Uuid, patch: AccountPatch) -> Result<Account, Error>;
}

/// Read access to one poll's state, taken from a single consistent snapshot.
pub trait PollRead {
    fn poll(&self) -> &Poll;
    fn members(&self) -> &[Membership];
    fn options(&self) -> &[Opt];
    /// Votes in the order they were cast.
    fn votes(&self) -> &[Vote];

    fn role_of(&self, account_id: Uuid) -> Option<Role> {
        self.members().iter().find(|m| m.account_id == account_id).map(|m| m.role)
    }

    fn option(&self, option_id: Uuid) -> Option<&Opt> {
        self.options().iter().find(|o| o.id == option_id)
    }

    fn has_vote(&self, option_id: Uuid, voter_id: Uuid) -> bool {
        self.votes().iter().any(|v| v.option_id == option_id && v.voter_id == voter_id)
    }
}

/// Mutations of one poll. Every change advances the poll's `updated_at`.
pub trait PollWrite: PollRead {
    fn add_member(&mut self, account_id: Uuid, role: Role) -> Membership;
    fn insert_option(&mut self, option: OptInsert) -> Opt;
    fn insert_vote(&mut self, option_id: Uuid, voter_id: Uuid) -> Vote;
    /// Returns the removed vote, `None` when there was nothing to remove.
    fn delete_vote(&mut self, option_id: Uuid, voter_id: Uuid) -> Option<Vote>;
    fn rename(&mut self, name: String);
    fn delete(&mut self);
}

/// A poll-scoped unit of work. Nothing is visible to other requests until `commit`;
/// dropping the transaction discards it.
pub trait TxStore: PollWrite {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}

pub trait Manager: AccountCommon {
    type Snapshot: PollRead;
    type Tx: TxStore;

    /// Creates the poll together with its owner membership, taking the first candidate
    /// invite code that no other poll holds. Fails with `Conflict` when every candidate is taken.
    async fn create_poll<I>(&self, poll: PollInsert, invite_codes: I) -> Result<(Poll, Membership), Error>
    where
        I: IntoIterator<Item = String>;
    async fn find_by_invite_code(&self, invite_code: &str) -> Result<Option<Uuid>, Error>;
    async fn polls_of(&self, account_id: Uuid) -> Result<Vec<Uuid>, Error>;
    /// Shared access to a poll. `NotFound` for unknown polls, `Unavailable` when the poll stays locked too long.
    async fn snapshot(&self, poll_id: Uuid) -> Result<Self::Snapshot, Error>;
    /// Exclusive access to a poll, same failure modes as `snapshot`.
    async fn tx(&self, poll_id: Uuid) -> Result<Self::Tx, Error>;
}
