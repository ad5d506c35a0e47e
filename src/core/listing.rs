//! Pool listing for a product page.
//!
//! Open pools come first, newest first within each group. Every member is
//! shown as a badge: the first letter of the nickname and a color picked from
//! a small palette. Badges are presentation only.

use crate::{
    entities::{Pool, User, pool, user},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

/// Pools shown on a product page.
pub const PRODUCT_PAGE_LIMIT: usize = 5;

/// Badge colors, in the order the nickname hash selects them.
pub const BADGE_COLORS: [&str; 5] = ["#4A90E2", "#5B7FE8", "#6C8FD9", "#7D9FCA", "#8EAFBB"];

const HANGUL_FIRST: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
// Syllables per leading consonant (21 vowels x 28 finals).
const HANGUL_BLOCK: u32 = 588;
const CHOSEONG: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ',
    'ㅌ', 'ㅍ', 'ㅎ',
];
const FALLBACK_INITIAL: char = 'ㅇ';

/// One member as shown on a pool card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantBadge {
    /// Leading letter of the nickname
    pub initial: char,
    /// CSS color
    pub color: &'static str,
}

/// A pool together with its derived member data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    /// The pool row
    pub pool: pool::Model,
    /// Number of members
    pub participant_count: usize,
    /// One badge per member, in join order
    pub participants: Vec<ParticipantBadge>,
}

/// Leading letter shown for a nickname.
///
/// Hangul syllables show their leading consonant; other scripts show the
/// upper-cased first character.
#[must_use]
pub fn initial_for(nickname: &str) -> char {
    let Some(first) = nickname.trim().chars().next() else {
        return FALLBACK_INITIAL;
    };
    let code = u32::from(first);
    if (HANGUL_FIRST..=HANGUL_LAST).contains(&code) {
        let index = usize::try_from((code - HANGUL_FIRST) / HANGUL_BLOCK).unwrap_or(0);
        return CHOSEONG.get(index).copied().unwrap_or(FALLBACK_INITIAL);
    }
    first.to_uppercase().next().unwrap_or(first)
}

/// Badge color for a nickname; the same nickname always gets the same color.
#[must_use]
pub fn color_for(nickname: &str) -> &'static str {
    let hash = nickname
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_mul(31).wrapping_add(u32::from(c)));
    let index = usize::try_from(hash).unwrap_or(0) % BADGE_COLORS.len();
    BADGE_COLORS[index]
}

/// Badge for a nickname.
#[must_use]
pub fn badge_for(nickname: &str) -> ParticipantBadge {
    ParticipantBadge {
        initial: initial_for(nickname),
        color: color_for(nickname),
    }
}

/// Pools for a product, open ones first and newest first within each group.
///
/// `limit` keeps only the first entries of that order.
pub async fn pools_for_product<C>(
    db: &C,
    product_id: i64,
    limit: Option<usize>,
) -> Result<Vec<PoolSummary>>
where
    C: ConnectionTrait,
{
    let mut pools = Pool::find()
        .filter(pool::Column::ProductId.eq(product_id))
        .order_by_desc(pool::Column::CreatedAt)
        .order_by_desc(pool::Column::Id)
        .all(db)
        .await?;
    // Stable sort keeps the recency order inside each group.
    pools.sort_by_key(|p| !p.is_open());
    if let Some(limit) = limit {
        pools.truncate(limit);
    }

    let mut summaries = Vec::with_capacity(pools.len());
    for pool in pools {
        let members = crate::core::enrollment::members(db, pool.id).await?;
        let user_ids: Vec<i64> = members.iter().map(|m| m.user_id).collect();
        let nicknames: HashMap<i64, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.nickname))
                .collect()
        };

        let participants: Vec<ParticipantBadge> = members
            .iter()
            .map(|m| badge_for(nicknames.get(&m.user_id).map_or("", String::as_str)))
            .collect();

        summaries.push(PoolSummary {
            pool,
            participant_count: participants.len(),
            participants,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enrollment::enroll;
    use crate::test_utils::*;

    #[test]
    fn test_initial_for_latin() {
        assert_eq!(initial_for("ana"), 'A');
        assert_eq!(initial_for("  bob"), 'B');
        assert_eq!(initial_for("7even"), '7');
    }

    #[test]
    fn test_initial_for_hangul() {
        assert_eq!(initial_for("김철수"), 'ㄱ');
        assert_eq!(initial_for("박"), 'ㅂ');
        assert_eq!(initial_for("하늘"), 'ㅎ');
        assert_eq!(initial_for("아이"), 'ㅇ');
    }

    #[test]
    fn test_initial_for_empty() {
        assert_eq!(initial_for(""), 'ㅇ');
        assert_eq!(initial_for("   "), 'ㅇ');
    }

    #[test]
    fn test_color_is_stable() {
        assert_eq!(color_for("ana"), color_for("ana"));
        assert!(BADGE_COLORS.contains(&color_for("김철수")));
        assert!(BADGE_COLORS.contains(&color_for("")));
    }

    #[tokio::test]
    async fn test_pools_for_product_order_and_badges() -> Result<()> {
        let db = setup_test_db().await?;
        let users = create_test_users(&db, 2).await?;

        let done = insert_raw_pool(&db, 5, users[0].id, 1).await?;
        enroll(&db, done.id, users[0].id).await?;
        mark_complete(&db, done.id).await?;
        let older_open = insert_raw_pool(&db, 5, users[0].id, 3).await?;
        let newer_open = insert_raw_pool(&db, 5, users[1].id, 3).await?;
        enroll(&db, newer_open.id, users[1].id).await?;
        enroll(&db, newer_open.id, users[0].id).await?;
        insert_raw_pool(&db, 6, users[0].id, 3).await?;

        let listed = pools_for_product(&db, 5, None).await?;
        let ids: Vec<i64> = listed.iter().map(|s| s.pool.id).collect();
        assert_eq!(ids, vec![newer_open.id, older_open.id, done.id]);

        let newer = &listed[0];
        assert_eq!(newer.participant_count, 2);
        assert_eq!(newer.participants[0], badge_for(&users[1].nickname));
        assert_eq!(newer.participants[1], badge_for(&users[0].nickname));
        assert_eq!(listed[1].participant_count, 0);

        let top = pools_for_product(&db, 5, Some(1)).await?;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].pool.id, newer_open.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_product_page_shows_top_five() -> Result<()> {
        let db = setup_test_db().await?;
        let users = create_test_users(&db, 1).await?;

        let mut open_ids = Vec::new();
        for _ in 0..6 {
            open_ids.push(insert_raw_pool(&db, 8, users[0].id, 3).await?.id);
        }
        let done = insert_raw_pool(&db, 8, users[0].id, 1).await?;
        mark_complete(&db, done.id).await?;

        let page = pools_for_product(&db, 8, Some(PRODUCT_PAGE_LIMIT)).await?;
        let ids: Vec<i64> = page.iter().map(|s| s.pool.id).collect();
        open_ids.reverse();
        assert_eq!(ids, open_ids[..PRODUCT_PAGE_LIMIT]);
        assert!(page.iter().all(|s| s.pool.is_open()));
        Ok(())
    }
}
