use super::{classify, log_finish, log_start, CollectReport, ItemOutcome};
use crate::api::{ApiClient, Gateway};
use crate::storage::{Storage, UserRecord};
use crate::TrawlerError;
use serde_json::Value;

/// Mines the friend lists of every user seen checking in
///
/// Friendships are recorded in both directions, once per crawl id.
#[derive(Debug, Clone, Copy, Default)]
pub struct FriendCrawl;

impl FriendCrawl {
    pub const CRAWL_TYPE: &'static str = "crawl-friends";

    pub async fn run<G, S>(
        &self,
        client: &mut ApiClient<G>,
        store: &mut S,
        config_hash: Option<&str>,
    ) -> Result<CollectReport, TrawlerError>
    where
        G: Gateway,
        S: Storage,
    {
        let mut report = CollectReport::new(Self::CRAWL_TYPE);
        let crawl_id = store.max_friendship_crawl_id()?.map_or(1, |id| id + 1);
        log_start(store, &report, config_hash)?;
        tracing::info!("crawl id = {}", crawl_id);

        let users = store.users_with_checkins()?;
        let total = users.len();
        let mut sum_degree = 0usize;

        for (index, user) in users.into_iter().enumerate() {
            report.items_seen += 1;

            let friends = match classify(client.friends_of(&user.id).await, &user.id, &mut report)? {
                ItemOutcome::Done(friends) => friends,
                ItemOutcome::Skip => continue,
                ItemOutcome::Stop => break,
            };
            report.items_processed += 1;
            sum_degree += friends.len();
            tracing::info!(
                "crawling user {} ({} of {}), found {} friends",
                user.id,
                index + 1,
                total,
                friends.len()
            );

            for friend in &friends {
                if !is_person(friend) {
                    tracing::debug!("friend of {} is not of type 'user', skipping", user.id);
                    continue;
                }
                let friend = match UserRecord::from_json(friend) {
                    Ok(friend) => friend,
                    Err(e) => {
                        tracing::warn!("bad friend entry for {}: {}", user.id, e);
                        continue;
                    }
                };

                store.upsert_user(&friend)?;
                if store.add_friendship(&user.id, &friend.id, crawl_id)? {
                    report.records_added += 1;
                }
                if store.add_friendship(&friend.id, &user.id, crawl_id)? {
                    report.records_added += 1;
                }
            }
        }

        tracing::info!("crawl {}: sum of node degrees: {}", crawl_id, sum_degree);
        log_finish(store, &report, config_hash)?;
        Ok(report)
    }
}

/// Pages and brands show up in friend lists with a non-`user` type
fn is_person(friend: &Value) -> bool {
    match friend.get("type").and_then(Value::as_str) {
        Some(kind) => kind.eq_ignore_ascii_case("user"),
        None => true,
    }
}
