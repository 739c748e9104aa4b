/// Half-open time intervals and the uptime arithmetic built on them.
///
/// A `Window` covers `[start, end)` in fight-relative milliseconds. An open
/// window (`end == None`) is still running; every consumer that needs a
/// duration closes it first, usually by clamping to the fight end.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: i64,
    pub end:   Option<i64>,
}

impl Window {
    pub fn open(start: i64) -> Self {
        Self { start, end: None }
    }

    pub fn closed(start: i64, end: i64) -> Self {
        debug_assert!(start <= end, "window closes before it starts: {start}..{end}");
        Self { start, end: Some(end) }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// `None` while the window is still open.
    pub fn duration(&self) -> Option<i64> {
        self.end.map(|end| end - self.start)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && self.end.map_or(true, |end| timestamp < end)
    }

    /// Close an open window at `end`, leaving closed windows untouched.
    pub fn close_at(&mut self, end: i64) {
        if self.end.is_none() {
            self.end = Some(end.max(self.start));
        }
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        let self_end  = self.end.unwrap_or(i64::MAX);
        let other_end = other.end.unwrap_or(i64::MAX);
        self.start < other_end && other.start < self_end
    }

    pub fn intersection(&self, other: &Window) -> Option<Window> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        Some(Window { start, end })
    }

    /// Restrict to `[range_start, range_end)`. `None` if nothing remains.
    pub fn clamp(&self, range_start: i64, range_end: i64) -> Option<Window> {
        self.intersection(&Window::closed(range_start, range_end))
    }
}

/// Fraction of the eligible duration covered by `windows`.
///
/// Eligible duration is `total_duration` minus every ignore window. Each
/// window's overlap with every ignore window is taken back out of the
/// covered time. With `max_duration`, no single window counts for longer
/// than that. Open windows count as zero; close them before calling.
///
/// Inputs are expected to be internally non-overlapping. The result is
/// always finite; a non-positive eligible duration yields `0.0`.
pub fn calculate_uptime(
    windows:        &[Window],
    ignore_windows: &[Window],
    total_duration: i64,
    max_duration:   Option<i64>,
) -> f64 {
    let mut covered = 0i64;

    for window in windows {
        let Some(end) = window.end else { continue };
        let end = match max_duration {
            Some(max) => end.min(window.start + max),
            None => end,
        };
        let effective = Window::closed(window.start, end.max(window.start));
        covered += effective.duration().unwrap_or(0);

        for ignore in ignore_windows.iter().filter(|w| !w.is_open()) {
            if let Some(overlap) = effective.intersection(ignore) {
                covered -= overlap.duration().unwrap_or(0);
            }
        }
    }

    let ignored: i64 = ignore_windows.iter().filter_map(Window::duration).sum();
    let eligible = total_duration - ignored;
    if eligible <= 0 {
        return 0.0;
    }
    covered as f64 / eligible as f64
}

/// Union of several window lists as one ascending, non-overlapping list.
///
/// Windows that touch (`next.start <= current.end`) are merged. An open
/// window swallows everything that starts after it.
pub fn combine_windows(lists: &[&[Window]]) -> Vec<Window> {
    let mut all: Vec<Window> = lists.iter().flat_map(|l| l.iter().copied()).collect();
    all.sort_by_key(|w| w.start);

    let mut merged: Vec<Window> = Vec::with_capacity(all.len());
    for window in all {
        match merged.last_mut() {
            Some(current) if current.end.map_or(true, |end| window.start <= end) => {
                current.end = match (current.end, window.end) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Clamp every window to `[start, end)`, dropping the ones outside it.
/// Open windows are treated as running until `end`.
pub fn clamp_windows(windows: &[Window], start: i64, end: i64) -> Vec<Window> {
    windows
        .iter()
        .filter_map(|w| {
            let mut w = *w;
            w.close_at(end);
            w.clamp(start, end)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn w(start: i64, end: i64) -> Window {
        Window::closed(start, end)
    }

    #[test]
    fn combines_overlapping_windows() {
        let merged = combine_windows(&[&[w(0, 5), w(3, 8), w(10, 12)]]);
        assert_eq!(merged, vec![w(0, 8), w(10, 12)]);
    }

    #[test]
    fn combines_across_lists_and_touching_edges() {
        let dead_zones = [w(10, 20)];
        let gargoyles  = [w(0, 10), w(30, 40)];
        let merged = combine_windows(&[&dead_zones, &gargoyles]);
        assert_eq!(merged, vec![w(0, 20), w(30, 40)]);
    }

    #[test]
    fn open_window_absorbs_later_ones() {
        let merged = combine_windows(&[&[Window::open(5), w(10, 20), w(0, 2)]]);
        assert_eq!(merged, vec![w(0, 2), Window::open(5)]);
    }

    #[test]
    fn contains_is_half_open() {
        let window = w(100, 200);
        assert!(window.contains(100));
        assert!(window.contains(199));
        assert!(!window.contains(200));
        assert!(Window::open(100).contains(1_000_000));
    }

    #[test]
    fn uptime_without_ignores() {
        let uptime = calculate_uptime(&[w(0, 250), w(500, 750)], &[], 1_000, None);
        assert!((uptime - 0.5).abs() < 1e-9);
    }

    #[test]
    fn uptime_excludes_ignored_time() {
        // 400ms covered, 100ms of it ignored; eligible = 1000 - 200
        let uptime = calculate_uptime(&[w(0, 400)], &[w(300, 400), w(800, 900)], 1_000, None);
        assert!((uptime - 300.0 / 800.0).abs() < 1e-9);
    }

    #[test]
    fn uptime_is_order_independent() {
        let windows = [w(0, 100), w(300, 450), w(600, 700)];
        let ignores = [w(50, 60), w(900, 950)];
        let mut rev_windows = windows;
        rev_windows.reverse();
        let mut rev_ignores = ignores;
        rev_ignores.reverse();

        let a = calculate_uptime(&windows, &ignores, 1_000, None);
        let b = calculate_uptime(&rev_windows, &rev_ignores, 1_000, None);
        assert!(a.is_finite());
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn uptime_caps_window_length() {
        let uptime = calculate_uptime(&[w(0, 600)], &[], 1_000, Some(200));
        assert!((uptime - 0.2).abs() < 1e-9);
    }

    #[test]
    fn uptime_survives_fully_ignored_fight() {
        let uptime = calculate_uptime(&[w(0, 10)], &[w(0, 1_000)], 1_000, None);
        assert_eq!(uptime, 0.0);
    }

    #[test]
    fn clamps_to_range() {
        let clamped = clamp_windows(&[w(0, 50), w(80, 150), Window::open(180)], 100, 200);
        assert_eq!(clamped, vec![w(100, 150), w(180, 200)]);
    }
}
