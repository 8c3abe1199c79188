use crate::domain::Score;

use super::types::ScoreRankUpdate;

/// Ranks a leaderboard's scores by modified score, best first, starting at 1.
///
/// `scores` must be in insertion order; the sort is stable so equal scores keep it.
pub fn assign_leaderboard_ranks(scores: &[Score]) -> Vec<ScoreRankUpdate> {
    let mut ordered: Vec<&Score> = scores.iter().collect();
    ordered.sort_by(|a, b| b.modified_score.cmp(&a.modified_score));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, score)| ScoreRankUpdate {
            score_id: score.id,
            rank: index as i64 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::score;

    #[test]
    fn test_ranks_follow_modified_score() {
        let scores = vec![
            score(1, "a", 7, 900),
            score(2, "b", 7, 950),
            score(3, "c", 7, 920),
        ];

        let updates = assign_leaderboard_ranks(&scores);
        let rank_of = |id: i64| updates.iter().find(|u| u.score_id == id).unwrap().rank;

        assert_eq!(rank_of(2), 1);
        assert_eq!(rank_of(3), 2);
        assert_eq!(rank_of(1), 3);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let scores = vec![
            score(4, "a", 7, 800),
            score(5, "b", 7, 800),
            score(6, "c", 7, 810),
        ];

        let ids: Vec<i64> = assign_leaderboard_ranks(&scores)
            .iter()
            .map(|u| u.score_id)
            .collect();
        assert_eq!(ids, vec![6, 4, 5]);
    }

    #[test]
    fn test_ranks_are_contiguous() {
        let scores: Vec<Score> = (0..50)
            .map(|i| score(i, "p", 1, (i * 37 % 11) * 1000))
            .collect();

        let mut ranks: Vec<i64> = assign_leaderboard_ranks(&scores)
            .iter()
            .map(|u| u.rank)
            .collect();
        ranks.sort();
        assert_eq!(ranks, (1..=50).collect::<Vec<i64>>());
    }
}
