use std::iter::repeat_with;

use itertools::Itertools;
use log::{info, warn};
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::core::models::poll::{Create, Insert as PollInsert, Join, PollView, Rename, Role};
use crate::core::ports::repository::{Manager, PollRead, PollWrite, TxStore};
use crate::error::Error;

pub const INVITE_CODE_LEN: usize = 8;
// no 0/O or 1/I, codes get read out loud
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const INVITE_CODE_ATTEMPTS: usize = 16;
pub const MAX_POLL_NAME_LEN: usize = 100;

pub fn gen_invite_code() -> String {
    let mut rng = thread_rng();
    (0..INVITE_CODE_LEN).map(|_| INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())] as char).collect()
}

pub(crate) fn validate_poll_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("poll name must not be empty".into()));
    }
    if name.chars().count() > MAX_POLL_NAME_LEN {
        return Err(Error::Invalid(format!("poll name must be at most {} characters", MAX_POLL_NAME_LEN)));
    }
    Ok(name.to_owned())
}

/// Membership check shared by every poll-scoped operation.
pub(crate) fn authorize<R>(poll: &R, account_id: Uuid) -> Result<Role, Error>
where
    R: PollRead,
{
    poll.role_of(account_id).ok_or_else(|| Error::Forbidden("You are not a member of this poll.".into()))
}

fn authorize_owner<R>(poll: &R, account_id: Uuid) -> Result<(), Error>
where
    R: PollRead,
{
    match authorize(poll, account_id)? {
        Role::Owner => Ok(()),
        Role::Member => Err(Error::Forbidden("Only the poll owner can do that.".into())),
    }
}

fn view_of<R>(poll: &R, role: Role) -> PollView
where
    R: PollRead,
{
    PollView::new(poll.poll(), role, poll.members())
}

pub async fn create_poll<M>(store: &M, owner_id: Uuid, Create { name }: Create) -> Result<PollView, Error>
where
    M: Manager,
{
    let name = validate_poll_name(&name)?;
    let (poll, owner) = store
        .create_poll(PollInsert { name, created_by: owner_id }, repeat_with(gen_invite_code).take(INVITE_CODE_ATTEMPTS))
        .await?;
    info!("poll created: {} by account {}", poll.id, owner_id);
    Ok(PollView::new(&poll, owner.role, &[owner]))
}

/// Every poll the account belongs to, most recently updated first. A poll whose lock
/// cannot be taken in time is left out of the listing.
pub async fn list_polls<M>(store: &M, account_id: Uuid) -> Result<Vec<PollView>, Error>
where
    M: Manager,
{
    let mut views = Vec::new();
    for poll_id in store.polls_of(account_id).await? {
        let snapshot = match store.snapshot(poll_id).await {
            Ok(snapshot) => snapshot,
            // deleted between the index read and the lock
            Err(Error::NotFound(_)) => continue,
            Err(Error::Unavailable(_)) => {
                warn!("poll {} is busy, left out of the listing for account {}", poll_id, account_id);
                continue;
            }
            Err(e) => return Err(e),
        };
        if let Some(role) = snapshot.role_of(account_id) {
            views.push(view_of(&snapshot, role));
        }
    }
    Ok(views.into_iter().sorted_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id))).collect())
}

pub async fn get_poll<M>(store: &M, poll_id: Uuid, account_id: Uuid) -> Result<PollView, Error>
where
    M: Manager,
{
    let snapshot = store.snapshot(poll_id).await?;
    let role = authorize(&snapshot, account_id)?;
    Ok(view_of(&snapshot, role))
}

/// Joins the poll the invite code belongs to.
pub async fn join_poll<M>(store: &M, account_id: Uuid, Join { invite_code }: Join) -> Result<PollView, Error>
where
    M: Manager,
{
    let invite_code = invite_code.trim().to_uppercase();
    if invite_code.is_empty() {
        return Err(Error::Invalid("invite code must not be empty".into()));
    }
    let poll_id = store
        .find_by_invite_code(&invite_code)
        .await?
        .ok_or_else(|| Error::NotFound("invalid invite code".into()))?;
    let mut tx = store.tx(poll_id).await?;
    // the code may have been freed while we waited for the lock
    if tx.poll().invite_code != invite_code {
        return Err(Error::NotFound("invalid invite code".into()));
    }
    if tx.role_of(account_id).is_some() {
        return Err(Error::Conflict("User is already a member or owner of this poll.".into()));
    }
    tx.add_member(account_id, Role::Member);
    let view = view_of(&tx, Role::Member);
    tx.commit().await?;
    info!("account {} joined poll {}", account_id, poll_id);
    Ok(view)
}

pub async fn rename_poll<M>(store: &M, poll_id: Uuid, account_id: Uuid, Rename { name }: Rename) -> Result<PollView, Error>
where
    M: Manager,
{
    let name = validate_poll_name(&name)?;
    let mut tx = store.tx(poll_id).await?;
    authorize_owner(&tx, account_id)?;
    tx.rename(name);
    let view = view_of(&tx, Role::Owner);
    tx.commit().await?;
    info!("poll renamed: {}", poll_id);
    Ok(view)
}

pub async fn delete_poll<M>(store: &M, poll_id: Uuid, account_id: Uuid) -> Result<(), Error>
where
    M: Manager,
{
    let mut tx = store.tx(poll_id).await?;
    authorize_owner(&tx, account_id)?;
    tx.delete();
    tx.commit().await?;
    info!("poll deleted: {} by account {}", poll_id, account_id);
    Ok(())
}
