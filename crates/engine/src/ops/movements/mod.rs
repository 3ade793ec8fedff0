//! The stock engine: every write that moves stock.
//!
//! Each operation runs as one unit of work. The ledger entry and the bin
//! quantities it implies are committed together or not at all.

use crate::{ResultEngine, store::bins};

mod create;
mod delete;
mod transfer;
mod update;

/// Lock two bins in ascending id order so that concurrent writers touching
/// the same pair cannot deadlock.
async fn lock_pair<C: sea_orm::ConnectionTrait>(db: &C, a: i32, b: i32) -> ResultEngine<()> {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    bins::find_for_update(db, first).await?;
    if second != first {
        bins::find_for_update(db, second).await?;
    }
    Ok(())
}
