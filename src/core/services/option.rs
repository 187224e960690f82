use log::info;
use uuid::Uuid;

use crate::core::models::option::{Insert as OptInsert, Opt, OptCreate};
use crate::core::ports::repository::{Manager, PollRead, PollWrite, TxStore};
use crate::core::services::poll::{authorize, MAX_POLL_NAME_LEN};
use crate::error::Error;

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

pub async fn add_option<M>(store: &M, poll_id: Uuid, account_id: Uuid, option: OptCreate) -> Result<Opt, Error>
where
    M: Manager,
{
    let name = option.name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("option name must not be empty".into()));
    }
    if name.chars().count() > MAX_POLL_NAME_LEN {
        return Err(Error::Invalid(format!("option name must be at most {} characters", MAX_POLL_NAME_LEN)));
    }
    let mut tx = store.tx(poll_id).await?;
    authorize(&tx, account_id)?;
    let opt = tx.insert_option(OptInsert {
        name: name.to_owned(),
        added_by: account_id,
        restaurant_id: non_blank(option.restaurant_id),
        image_url: non_blank(option.image_url),
        menu_url: non_blank(option.menu_url),
    });
    tx.commit().await?;
    info!("option {} added to poll {} by account {}", opt.id, poll_id, account_id);
    Ok(opt)
}

/// Options of the poll in the order they were added.
pub async fn list_options<M>(store: &M, poll_id: Uuid, account_id: Uuid) -> Result<Vec<Opt>, Error>
where
    M: Manager,
{
    let snapshot = store.snapshot(poll_id).await?;
    authorize(&snapshot, account_id)?;
    Ok(snapshot.options().to_vec())
}
