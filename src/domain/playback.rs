/// Echo playback engine.
///
/// ## Lifecycle
///
///   Playing ──(age > duration + grace)──▶ Expired (terminal)
///
/// Each tick a playing echo:
///   1. ages by `dt`
///   2. expires if it ran past its timeline plus the grace period
///   3. samples its timeline at `min(age, duration)` and lerps between
///      the bracketing pair of samples
///   4. pushes every crate within contact reach, one cell, in the
///      direction of the current segment (or away from itself when the
///      segment is static)
///   5. presses every switch within trigger reach
///
/// Echoes are immaterial: walls and doors never stop them, and a failed
/// push does not deflect them. They only replay positions the player
/// already reached legally.

use crate::config::SimTuning;
use super::entity::{Crate, Door, Echo, EchoState, Switch, TriggerSource};
use super::geom::dominant_axis;
use super::physics::{self, Board, Push};
use super::recorder::TimeSample;

/// Minimum time span (ms) between two bracketing samples.
/// Duplicate timestamps would otherwise divide by zero.
const MIN_SPAN_MS: f64 = 1.0;

/// What an echo did this tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EchoTick {
    pub expired: bool,
    pub pushes: Vec<Push>,
    pub sensed: Vec<usize>,
}

pub fn advance_echo(
    echo: &mut Echo,
    dt_ms: f64,
    board: &Board,
    door: &Door,
    crates: &mut [Crate],
    switches: &mut [Switch],
    tuning: &SimTuning,
) -> EchoTick {
    if !echo.is_alive() {
        return EchoTick { expired: true, ..Default::default() };
    }

    let total = echo.timeline.duration();
    let next_age = echo.age_ms + dt_ms.max(0.0);
    if next_age > total + tuning.echo_grace_ms {
        echo.state = EchoState::Expired;
        return EchoTick { expired: true, ..Default::default() };
    }
    echo.age_ms = next_age;

    let Some((a, b)) = bracket(echo, echo.age_ms.min(total)) else {
        return EchoTick::default();
    };
    let t = echo.age_ms.min(total);
    let span = (b.t - a.t).max(MIN_SPAN_MS);
    let f = ((t - a.t) / span).clamp(0.0, 1.0) as f32;
    echo.pos = a.pos.lerp(b.pos, f);

    let tile = tuning.tile_size;
    let segment = b.pos - a.pos;
    let mut pushes = vec![];

    let reach = tuning.contact_radius * tile;
    let in_reach: Vec<usize> = crates.iter().enumerate()
        .filter(|(_, c)| c.center(tile).distance(echo.pos) <= reach)
        .map(|(i, _)| i)
        .collect();
    for idx in in_reach {
        let away = crates[idx].center(tile) - echo.pos;
        let step = dominant_axis(segment.x, segment.y)
            .or_else(|| dominant_axis(away.x, away.y));
        if let Some(step) = step {
            if let Some(push) = physics::attempt_push(board, door, crates, switches, idx, step) {
                pushes.push(push);
            }
        }
    }

    let sensed = physics::press_nearby(
        switches, echo.pos, tuning.trigger_radius * tile, tile, TriggerSource::Echo,
    );

    EchoTick { expired: false, pushes, sensed }
}

/// Find `(a, b)` with `a.t <= t <= b.t`, advancing the echo's cursor.
/// At the end of the timeline `a == b == last`.
fn bracket(echo: &mut Echo, t: f64) -> Option<(TimeSample, TimeSample)> {
    let samples = echo.timeline.samples();
    if samples.is_empty() {
        return None;
    }
    let last = samples.len() - 1;
    while echo.cursor < last && samples[echo.cursor + 1].t <= t {
        echo.cursor += 1;
    }
    let a = samples[echo.cursor];
    let b = samples[(echo.cursor + 1).min(last)];
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geom::{GridCell, Vec2};
    use crate::domain::recorder::Timeline;

    const TILE: f32 = 32.0;

    fn tuning() -> SimTuning {
        SimTuning::default()
    }

    /// Straight line from cell `from` to cell `to` (centers), sampled every 16ms.
    fn line(from: GridCell, to: GridCell, duration_ms: f64) -> Timeline {
        let a = from.center(TILE);
        let b = to.center(TILE);
        let steps = (duration_ms / 16.0).ceil() as usize;
        let samples = (0..=steps)
            .map(|i| {
                let t = (i as f64 * 16.0).min(duration_ms);
                let f = (t / duration_ms) as f32;
                TimeSample { t, pos: a.lerp(b, f) }
            })
            .collect();
        Timeline::from_samples(samples)
    }

    fn still(cell: GridCell, n: usize) -> Timeline {
        let p = cell.center(TILE);
        Timeline::from_samples((0..n).map(|i| TimeSample { t: i as f64 * 16.0, pos: p }).collect())
    }

    fn run(echo: &mut Echo, dt: f64, board: &Board, crates: &mut [Crate], switches: &mut [Switch]) -> EchoTick {
        let nowhere = Door::new(GridCell::new(-10, -10), false);
        advance_echo(echo, dt, board, &nowhere, crates, switches, &tuning())
    }

    #[test]
    fn starts_on_first_sample() {
        let tl = line(GridCell::new(1, 1), GridCell::new(5, 1), 400.0);
        let first = tl.first().unwrap().pos;
        let mut echo = Echo::new(1, tl);
        let board = Board::new(8, 3);
        run(&mut echo, 0.0, &board, &mut [], &mut []);
        assert_eq!(echo.pos, first);
    }

    #[test]
    fn ends_on_last_sample() {
        let tl = line(GridCell::new(1, 1), GridCell::new(5, 1), 400.0);
        let last = tl.last().unwrap().pos;
        let mut echo = Echo::new(1, tl);
        let board = Board::new(8, 3);
        run(&mut echo, 400.0, &board, &mut [], &mut []);
        assert_eq!(echo.pos, last);
        run(&mut echo, 40.0, &board, &mut [], &mut []);
        assert_eq!(echo.pos, last);
        assert!(echo.is_alive());
    }

    #[test]
    fn interpolates_between_samples() {
        let tl = Timeline::from_samples(vec![
            TimeSample { t: 0.0, pos: Vec2::new(0.0, 0.0) },
            TimeSample { t: 100.0, pos: Vec2::new(100.0, 50.0) },
        ]);
        let mut echo = Echo::new(1, tl);
        let board = Board::new(8, 8);
        run(&mut echo, 25.0, &board, &mut [], &mut []);
        assert_eq!(echo.pos, Vec2::new(25.0, 12.5));
        run(&mut echo, 50.0, &board, &mut [], &mut []);
        assert_eq!(echo.pos, Vec2::new(75.0, 37.5));
    }

    #[test]
    fn lifetime_bounded_by_grace() {
        let tl = line(GridCell::new(0, 0), GridCell::new(2, 0), 100.0);
        let mut echo = Echo::new(1, tl);
        let board = Board::new(4, 1);
        let mut ticks = 0;
        loop {
            let out = run(&mut echo, 16.0, &board, &mut [], &mut []);
            ticks += 1;
            if out.expired {
                break;
            }
            assert!(echo.age_ms <= 100.0 + 50.0);
            assert!(ticks < 100);
        }
        assert_eq!(echo.state, EchoState::Expired);
        // 9 * 16 = 144 is the last alive age; 160 crosses 150.
        assert_eq!(ticks, 10);
        let again = run(&mut echo, 16.0, &board, &mut [], &mut []);
        assert!(again.expired);
    }

    #[test]
    fn duplicate_timestamps_never_divide_by_zero() {
        let p = Vec2::new(40.0, 40.0);
        let q = Vec2::new(90.0, 40.0);
        let tl = Timeline::from_samples(vec![
            TimeSample { t: 0.0, pos: p },
            TimeSample { t: 0.0, pos: p },
            TimeSample { t: 0.0, pos: q },
            TimeSample { t: 0.0, pos: q },
            TimeSample { t: 0.0, pos: q },
        ]);
        let mut echo = Echo::new(1, tl);
        let board = Board::new(8, 8);
        let out = run(&mut echo, 10.0, &board, &mut [], &mut []);
        assert!(!out.expired);
        assert!(echo.pos.x.is_finite() && echo.pos.y.is_finite());
        assert_eq!(echo.pos, q);
    }

    #[test]
    fn pushes_crate_along_segment() {
        let tl = line(GridCell::new(0, 1), GridCell::new(6, 1), 600.0);
        let mut echo = Echo::new(1, tl);
        let board = Board::new(10, 3);
        let mut crates = vec![Crate::new(GridCell::new(3, 1))];
        let mut pushes = 0;
        for _ in 0..40 {
            pushes += run(&mut echo, 16.0, &board, &mut crates, &mut []).pushes.len();
        }
        assert!(pushes >= 1);
        assert_eq!(crates[0].cell.row, 1);
        assert!(crates[0].cell.col > 3);
    }

    #[test]
    fn static_echo_pushes_away_from_itself() {
        let mut echo = Echo::new(1, still(GridCell::new(2, 2), 6));
        let board = Board::new(6, 6);
        let echo_pos = GridCell::new(2, 2).center(TILE);
        let mut crates = vec![Crate::new(GridCell::new(2, 2))];
        let out = run(&mut echo, 16.0, &board, &mut crates, &mut []);
        // Exactly coincident: no direction can be derived, nothing moves.
        assert!(out.pushes.is_empty());
        assert_eq!(crates[0].cell, GridCell::new(2, 2));

        // Standing 12 units below the crate's center: inside reach, crate goes up.
        let mut echo = Echo::new(2, Timeline::from_samples(
            (0..6).map(|i| TimeSample { t: i as f64 * 16.0, pos: echo_pos + Vec2::new(0.0, 12.0) }).collect(),
        ));
        let out = run(&mut echo, 16.0, &board, &mut crates, &mut []);
        assert_eq!(out.pushes.len(), 1);
        assert_eq!(crates[0].cell, GridCell::new(2, 1));
    }

    #[test]
    fn failed_push_does_not_deflect_echo() {
        let tl = line(GridCell::new(0, 0), GridCell::new(3, 0), 300.0);
        let mut echo = Echo::new(1, tl);
        let board = Board::with_walls(5, 1, &[GridCell::new(2, 0)]);
        let mut crates = vec![Crate::new(GridCell::new(1, 0))];
        for _ in 0..25 {
            run(&mut echo, 16.0, &board, &mut crates, &mut []);
        }
        assert_eq!(crates[0].cell, GridCell::new(1, 0));
        // Walked straight through the crate and the wall.
        assert_eq!(GridCell::of(echo.pos, TILE), GridCell::new(3, 0));
    }

    #[test]
    fn closed_door_stops_echo_push() {
        let tl = line(GridCell::new(0, 0), GridCell::new(4, 0), 400.0);
        let mut echo = Echo::new(1, tl);
        let board = Board::new(6, 1);
        let door = Door::new(GridCell::new(3, 0), false);
        let mut crates = vec![Crate::new(GridCell::new(2, 0))];
        for _ in 0..30 {
            let out = advance_echo(&mut echo, 16.0, &board, &door, &mut crates, &mut [], &tuning());
            assert!(out.pushes.is_empty());
        }
        assert_eq!(crates[0].cell, GridCell::new(2, 0));
    }

    #[test]
    fn senses_switch_within_trigger_reach() {
        let mut echo = Echo::new(1, still(GridCell::new(4, 4), 6));
        let board = Board::new(8, 8);
        let mut switches = vec![
            Switch::new("S1", GridCell::new(4, 4)),
            Switch::new("S2", GridCell::new(5, 4)),
        ];
        let out = run(&mut echo, 16.0, &board, &mut [], &mut switches);
        assert_eq!(out.sensed, vec![0]);
        assert!(switches[0].sources.by_echo);
        assert!(!switches[0].sources.by_player);
        assert!(!switches[1].is_active());
    }
}
