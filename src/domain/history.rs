use std::collections::HashMap;

use chrono::NaiveDate;

use super::models::{
    AccuracyStats, DailyHistory, HistoryChange, LeaderboardId, Player, PlayerScore,
    PlayerStatisticHistoryEntry, PreviousScore, Score, ScoreCounts,
};
use crate::rating::boundary;

/// Everything known about a player when the day's entry is built
pub struct HistoryInput<'a> {
    pub player: &'a Player,
    pub scores: &'a [PlayerScore],
    pub previous_scores: &'a [PreviousScore],
    pub previous_entry: Option<&'a PlayerStatisticHistoryEntry>,
}

/// Builds the entry for `date` from the current snapshot.
///
/// The result depends only on its input, so rebuilding the same day yields the
/// same entry instead of accumulating counters.
pub fn build_history_entry(date: NaiveDate, input: &HistoryInput) -> DailyHistory {
    let ranked_pps = ranked_pps(input.scores);

    let entry = PlayerStatisticHistoryEntry {
        player_id: input.player.id.clone(),
        date,
        rank: input.player.rank,
        country_rank: input.player.country_rank,
        pp: input.player.pp,
        plus_one_pp: boundary::plus_one_pp(&ranked_pps),
        accuracy: AccuracyStats {
            average_ranked_accuracy: input
                .player
                .average_ranked_accuracy
                .or_else(|| average_ranked_accuracy(input.scores)),
        },
        scores: count_scores(date, input.scores, input.previous_scores),
    };

    let change = input
        .previous_entry
        .filter(|previous| previous.date < date)
        .map(|previous| compare_entries(previous, &entry));

    DailyHistory { entry, change }
}

fn ranked_pps(scores: &[PlayerScore]) -> Vec<f64> {
    scores
        .iter()
        .filter(|s| s.leaderboard.awards_pp())
        .map(|s| s.score.pp)
        .collect()
}

fn average_ranked_accuracy(scores: &[PlayerScore]) -> Option<f64> {
    let accuracies: Vec<f64> = scores
        .iter()
        .filter(|s| s.leaderboard.awards_pp())
        .filter_map(|s| s.score.accuracy)
        .collect();

    if accuracies.is_empty() {
        return None;
    }
    Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
}

fn count_scores(
    date: NaiveDate,
    scores: &[PlayerScore],
    previous_scores: &[PreviousScore],
) -> ScoreCounts {
    let ranked_by_leaderboard: HashMap<LeaderboardId, bool> = scores
        .iter()
        .map(|s| (s.leaderboard.id, s.leaderboard.awards_pp()))
        .collect();

    let mut counts = ScoreCounts {
        total_scores: scores.len() as i64,
        total_ranked_scores: scores.iter().filter(|s| s.leaderboard.awards_pp()).count() as i64,
        ..ScoreCounts::default()
    };

    for (leaderboard_id, timeline) in build_timelines(scores, previous_scores) {
        let ranked = ranked_by_leaderboard
            .get(&leaderboard_id)
            .copied()
            .unwrap_or(false);
        count_day_plays(date, &timeline, ranked, &mut counts);
    }

    counts
}

// Every play per leaderboard, oldest first.
fn build_timelines<'a>(
    scores: &'a [PlayerScore],
    previous_scores: &'a [PreviousScore],
) -> HashMap<LeaderboardId, Vec<&'a Score>> {
    let mut timelines: HashMap<LeaderboardId, Vec<&Score>> = HashMap::new();

    let all = previous_scores
        .iter()
        .map(|p| &p.score)
        .chain(scores.iter().map(|s| &s.score));
    for score in all {
        timelines.entry(score.leaderboard_id).or_default().push(score);
    }

    for timeline in timelines.values_mut() {
        timeline.sort_by_key(|s| s.timestamp);
    }
    timelines
}

fn count_day_plays(date: NaiveDate, timeline: &[&Score], ranked: bool, counts: &mut ScoreCounts) {
    for (index, score) in timeline.iter().enumerate() {
        if score.timestamp.date_naive() != date {
            continue;
        }

        let improved = index > 0 && score.improves_on(timeline[index - 1], ranked);
        match (ranked, improved) {
            (true, true) => {
                counts.ranked_scores += 1;
                counts.ranked_scores_improved += 1;
            }
            (true, false) => counts.ranked_scores += 1,
            (false, true) => {
                counts.unranked_scores += 1;
                counts.unranked_scores_improved += 1;
            }
            (false, false) => counts.unranked_scores += 1,
        }
    }
}

fn compare_entries(
    previous: &PlayerStatisticHistoryEntry,
    current: &PlayerStatisticHistoryEntry,
) -> HistoryChange {
    HistoryChange {
        rank: rank_movement(previous.rank, current.rank),
        country_rank: rank_movement(previous.country_rank, current.country_rank),
        pp: current.pp - previous.pp,
        average_ranked_accuracy: match (
            previous.accuracy.average_ranked_accuracy,
            current.accuracy.average_ranked_accuracy,
        ) {
            (Some(before), Some(after)) => Some(after - before),
            _ => None,
        },
    }
}

fn rank_movement(before: Option<i64>, after: Option<i64>) -> Option<i64> {
    Some(before? - after?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, leaderboard, player, score};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn ranked_play(id: i64, lb: i64, pp: f64, hour: u32) -> PlayerScore {
        let mut s = score(id, "p1", lb, 900);
        s.pp = pp;
        s.timestamp = at(2024, 5, 1, hour);
        PlayerScore {
            score: s,
            leaderboard: leaderboard(lb, 6.0, true),
        }
    }

    #[test]
    fn test_snapshot_fields_are_copied() {
        let p = player("p1");
        let scores = vec![ranked_play(1, 10, 300.0, 9)];
        let input = HistoryInput {
            player: &p,
            scores: &scores,
            previous_scores: &[],
            previous_entry: None,
        };

        let history = build_history_entry(day(), &input);
        assert_eq!(history.entry.rank, p.rank);
        assert_eq!(history.entry.country_rank, p.country_rank);
        assert_eq!(history.entry.pp, p.pp);
        assert!(history.entry.plus_one_pp.is_some());
        assert!(history.change.is_none(), "first-seen day has no deltas");
    }

    #[test]
    fn test_new_scores_are_not_improvements() {
        let p = player("p1");
        let mut unranked = ranked_play(2, 11, 0.0, 10);
        unranked.leaderboard = leaderboard(11, 0.0, false);
        let scores = vec![ranked_play(1, 10, 300.0, 9), unranked];

        let input = HistoryInput {
            player: &p,
            scores: &scores,
            previous_scores: &[],
            previous_entry: None,
        };
        let counts = build_history_entry(day(), &input).entry.scores;

        assert_eq!(counts.ranked_scores, 1);
        assert_eq!(counts.unranked_scores, 1);
        assert_eq!(counts.ranked_scores_improved, 0);
        assert_eq!(counts.unranked_scores_improved, 0);
        assert_eq!(counts.total_scores, 2);
        assert_eq!(counts.total_ranked_scores, 1);
    }

    #[test]
    fn test_improvement_requires_strict_gain() {
        let p = player("p1");
        let scores = vec![ranked_play(1, 10, 300.0, 12), ranked_play(2, 20, 150.0, 12)];

        let mut better_before = score(90, "p1", 10, 850);
        better_before.pp = 280.0;
        better_before.timestamp = at(2024, 4, 20, 8);
        let mut equal_before = score(91, "p1", 20, 880);
        equal_before.pp = 150.0;
        equal_before.timestamp = at(2024, 4, 21, 8);

        let previous = vec![
            PreviousScore { score: better_before, archived_at: at(2024, 5, 1, 12) },
            PreviousScore { score: equal_before, archived_at: at(2024, 5, 1, 12) },
        ];
        let input = HistoryInput {
            player: &p,
            scores: &scores,
            previous_scores: &previous,
            previous_entry: None,
        };
        let counts = build_history_entry(day(), &input).entry.scores;

        assert_eq!(counts.ranked_scores, 2);
        assert_eq!(counts.ranked_scores_improved, 1);
    }

    #[test]
    fn test_starless_ranked_map_counts_as_unranked() {
        let p = player("p1");
        let mut current = ranked_play(1, 12, 0.0, 12);
        current.leaderboard = leaderboard(12, 0.0, true);

        let mut before = score(92, "p1", 12, 850);
        before.timestamp = at(2024, 4, 22, 8);
        let previous = vec![PreviousScore { score: before, archived_at: at(2024, 5, 1, 12) }];

        let scores = vec![current];
        let input = HistoryInput {
            player: &p,
            scores: &scores,
            previous_scores: &previous,
            previous_entry: None,
        };
        let counts = build_history_entry(day(), &input).entry.scores;

        assert_eq!(counts.total_ranked_scores, 0);
        assert_eq!(counts.unranked_scores, 1);
        assert_eq!(counts.unranked_scores_improved, 1);
    }

    #[test]
    fn test_only_plays_on_the_date_count() {
        let p = player("p1");
        let scores = vec![ranked_play(1, 10, 300.0, 9)];
        let input = HistoryInput {
            player: &p,
            scores: &scores,
            previous_scores: &[],
            previous_entry: None,
        };

        let next_day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let counts = build_history_entry(next_day, &input).entry.scores;
        assert_eq!(counts.ranked_scores, 0);
        assert_eq!(counts.total_scores, 1);
    }

    #[test]
    fn test_change_against_previous_day() {
        let p = player("p1");
        let input = HistoryInput {
            player: &p,
            scores: &[],
            previous_scores: &[],
            previous_entry: None,
        };
        let mut yesterday = build_history_entry(day(), &input).entry;
        yesterday.date = day().pred_opt().unwrap();
        yesterday.rank = Some(p.rank.unwrap() + 25);
        yesterday.pp = p.pp - 12.5;

        let input = HistoryInput { previous_entry: Some(&yesterday), ..input };
        let change = build_history_entry(day(), &input).change.unwrap();

        assert_eq!(change.rank, Some(25));
        assert!((change.pp - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_player_without_ranked_scores() {
        let mut p = player("p1");
        p.average_ranked_accuracy = None;
        let input = HistoryInput {
            player: &p,
            scores: &[],
            previous_scores: &[],
            previous_entry: None,
        };

        let entry = build_history_entry(day(), &input).entry;
        assert_eq!(entry.plus_one_pp, None);
        assert_eq!(entry.accuracy.average_ranked_accuracy, None);
    }
}
