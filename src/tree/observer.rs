//! Viewport observation of "load more" rows.
//!
//! Two strategies share the [`ViewportObserver`] contract. The intersection
//! strategy reports observed elements as they start intersecting the
//! viewport. The polling strategy ignores registrations and, on a fixed
//! interval, scans the document for the first "load more" row that is fully
//! inside the viewport.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::dom::layout::{Layout, Viewport};
use crate::dom::{Document, ElementId};

use super::controller::LOAD_MORE_CLASS;

/// Default polling interval of the fallback strategy.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which observation strategy a tree uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverStrategy {
    /// Intersection when the surface supports it, polling otherwise.
    #[default]
    Auto,
    Intersection,
    Polling,
}

impl ObserverStrategy {
    /// Parse from config string; unknown values mean `Auto`.
    pub fn from_str(s: &str) -> Self {
        match s {
            "intersection" => ObserverStrategy::Intersection,
            "polling" => ObserverStrategy::Polling,
            _ => ObserverStrategy::Auto,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObserverStrategy::Auto => "auto",
            ObserverStrategy::Intersection => "intersection",
            ObserverStrategy::Polling => "polling",
        }
    }
}

/// What an observer needs to know about the surface at one instant.
pub struct ViewportSnapshot<'a> {
    pub doc: &'a Document,
    pub layout: &'a Layout,
    pub root: ElementId,
    pub viewport: Viewport,
}

/// Watches "load more" rows and reports the ones to activate.
pub trait ViewportObserver {
    fn observe(&mut self, el: ElementId);
    fn unobserve(&mut self, el: ElementId);
    /// Drop every registration.
    fn disconnect(&mut self);
    /// Re-attach after a full render.
    fn connect(&mut self, now: Instant);
    /// Stop for good; later `connect` calls are ignored.
    fn dispose(&mut self);
    /// The concrete strategy in use.
    fn strategy(&self) -> ObserverStrategy;

    /// Called whenever layout or scroll position changes.
    fn on_viewport_change(&mut self, _snapshot: &ViewportSnapshot<'_>) -> Vec<ElementId> {
        Vec::new()
    }

    /// Called on every timer tick of the host loop.
    fn on_tick(&mut self, _snapshot: &ViewportSnapshot<'_>, _now: Instant) -> Vec<ElementId> {
        Vec::new()
    }
}

/// Pick the observer for a surface, once, at tree construction.
pub fn observer_for(
    strategy: ObserverStrategy,
    supports_intersection: bool,
    poll_interval: Duration,
) -> Box<dyn ViewportObserver> {
    let use_intersection = match strategy {
        ObserverStrategy::Auto => supports_intersection,
        ObserverStrategy::Intersection => true,
        ObserverStrategy::Polling => false,
    };
    if use_intersection {
        Box::new(IntersectionObserver::default())
    } else {
        Box::new(PollingObserver::new(poll_interval))
    }
}

// ── Intersection strategy ────────────────────────────────────────────────────

/// Fires once for each observed element when it starts intersecting.
#[derive(Debug, Default)]
pub struct IntersectionObserver {
    observed: Vec<ElementId>,
    intersecting: HashSet<ElementId>,
    connected: bool,
    disposed: bool,
}

impl IntersectionObserver {
    pub fn observed(&self) -> &[ElementId] {
        &self.observed
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl ViewportObserver for IntersectionObserver {
    fn observe(&mut self, el: ElementId) {
        if self.disposed {
            return;
        }
        if !self.observed.contains(&el) {
            self.observed.push(el);
        }
        // A fresh registration reports its initial state.
        self.intersecting.remove(&el);
    }

    fn unobserve(&mut self, el: ElementId) {
        self.observed.retain(|e| *e != el);
        self.intersecting.remove(&el);
    }

    fn disconnect(&mut self) {
        self.observed.clear();
        self.intersecting.clear();
        self.connected = false;
    }

    fn connect(&mut self, _now: Instant) {
        self.connected = !self.disposed;
    }

    fn dispose(&mut self) {
        self.disconnect();
        self.disposed = true;
    }

    fn strategy(&self) -> ObserverStrategy {
        ObserverStrategy::Intersection
    }

    fn on_viewport_change(&mut self, snapshot: &ViewportSnapshot<'_>) -> Vec<ElementId> {
        if !self.connected {
            return Vec::new();
        }
        let mut entries = Vec::new();
        for &el in &self.observed {
            let ratio = snapshot
                .layout
                .span(el)
                .map(|span| snapshot.viewport.intersection_ratio(span))
                .unwrap_or(0.0);
            if ratio > 0.0 && ratio <= 1.0 {
                if self.intersecting.insert(el) {
                    entries.push(el);
                }
            } else {
                self.intersecting.remove(&el);
            }
        }
        entries
    }
}

// ── Polling strategy ─────────────────────────────────────────────────────────

/// One timer per tree; each due tick activates at most one row.
#[derive(Debug)]
pub struct PollingObserver {
    interval: Duration,
    next_due: Option<Instant>,
    disposed: bool,
}

impl PollingObserver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            disposed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }
}

impl ViewportObserver for PollingObserver {
    fn observe(&mut self, _el: ElementId) {}

    fn unobserve(&mut self, _el: ElementId) {}

    fn disconnect(&mut self) {}

    fn connect(&mut self, now: Instant) {
        if self.disposed || self.next_due.is_some() {
            return;
        }
        self.next_due = Some(now + self.interval);
    }

    fn dispose(&mut self) {
        self.next_due = None;
        self.disposed = true;
    }

    fn strategy(&self) -> ObserverStrategy {
        ObserverStrategy::Polling
    }

    fn on_tick(&mut self, snapshot: &ViewportSnapshot<'_>, now: Instant) -> Vec<ElementId> {
        let Some(due) = self.next_due else {
            return Vec::new();
        };
        if now < due {
            return Vec::new();
        }
        self.next_due = Some(now + self.interval);

        snapshot
            .doc
            .query_class(snapshot.root, LOAD_MORE_CLASS)
            .into_iter()
            .find(|el| {
                snapshot
                    .layout
                    .span(*el)
                    .is_some_and(|span| snapshot.viewport.contains(span))
            })
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A target holding `rows` plain rows followed by two "load more" rows.
    fn surface(rows: usize) -> (Document, ElementId, Vec<ElementId>) {
        let mut doc = Document::new();
        let target = doc.create_element("div");
        doc.append_child(doc.body(), target);
        for i in 0..rows {
            let row = doc.create_element("div");
            doc.set_text(row, format!("row {i}"));
            doc.append_child(target, row);
        }
        let mut more = Vec::new();
        for _ in 0..2 {
            let el = doc.create_element("div");
            doc.add_class(el, LOAD_MORE_CLASS);
            doc.set_text(el, "Load more");
            doc.append_child(target, el);
            more.push(el);
        }
        (doc, target, more)
    }

    #[test]
    fn strategy_selection() {
        let interval = DEFAULT_POLL_INTERVAL;
        assert_eq!(
            observer_for(ObserverStrategy::Auto, true, interval).strategy(),
            ObserverStrategy::Intersection
        );
        assert_eq!(
            observer_for(ObserverStrategy::Auto, false, interval).strategy(),
            ObserverStrategy::Polling
        );
        assert_eq!(
            observer_for(ObserverStrategy::Polling, true, interval).strategy(),
            ObserverStrategy::Polling
        );
        assert_eq!(ObserverStrategy::from_str("polling"), ObserverStrategy::Polling);
        assert_eq!(ObserverStrategy::from_str("bogus"), ObserverStrategy::Auto);
    }

    #[test]
    fn intersection_fires_once_per_entry() {
        let (doc, target, more) = surface(3);
        let layout = Layout::compute(&doc, target);
        let mut observer = IntersectionObserver::default();
        observer.connect(Instant::now());
        observer.observe(more[0]);
        observer.observe(more[1]);

        let snapshot = ViewportSnapshot {
            doc: &doc,
            layout: &layout,
            root: target,
            viewport: Viewport::new(0, 4),
        };
        assert_eq!(observer.on_viewport_change(&snapshot), vec![more[0]]);
        assert!(observer.on_viewport_change(&snapshot).is_empty());

        let scrolled = ViewportSnapshot {
            viewport: Viewport::new(1, 4),
            ..snapshot
        };
        assert_eq!(observer.on_viewport_change(&scrolled), vec![more[1]]);
    }

    #[test]
    fn intersection_reobserve_reports_again() {
        let (doc, target, more) = surface(0);
        let layout = Layout::compute(&doc, target);
        let mut observer = IntersectionObserver::default();
        observer.connect(Instant::now());
        observer.observe(more[0]);
        let snapshot = ViewportSnapshot {
            doc: &doc,
            layout: &layout,
            root: target,
            viewport: Viewport::new(0, 1),
        };
        assert_eq!(observer.on_viewport_change(&snapshot), vec![more[0]]);
        observer.unobserve(more[0]);
        observer.observe(more[0]);
        assert_eq!(observer.on_viewport_change(&snapshot), vec![more[0]]);
    }

    #[test]
    fn intersection_is_silent_when_disconnected() {
        let (doc, target, more) = surface(0);
        let layout = Layout::compute(&doc, target);
        let mut observer = IntersectionObserver::default();
        observer.observe(more[0]);
        let snapshot = ViewportSnapshot {
            doc: &doc,
            layout: &layout,
            root: target,
            viewport: Viewport::new(0, 10),
        };
        assert!(observer.on_viewport_change(&snapshot).is_empty());

        observer.connect(Instant::now());
        observer.disconnect();
        assert!(observer.observed().is_empty());
        assert!(!observer.is_connected());

        observer.dispose();
        observer.connect(Instant::now());
        assert!(!observer.is_connected());
    }

    #[test]
    fn polling_waits_for_interval_and_clicks_first_contained() {
        let (doc, target, more) = surface(2);
        let layout = Layout::compute(&doc, target);
        let mut observer = PollingObserver::new(Duration::from_millis(100));
        let start = Instant::now();
        observer.connect(start);

        let snapshot = ViewportSnapshot {
            doc: &doc,
            layout: &layout,
            root: target,
            viewport: Viewport::new(0, 4),
        };
        assert!(observer
            .on_tick(&snapshot, start + Duration::from_millis(50))
            .is_empty());
        assert_eq!(
            observer.on_tick(&snapshot, start + Duration::from_millis(100)),
            vec![more[0]]
        );
        // Next tick is a full interval away.
        assert!(observer
            .on_tick(&snapshot, start + Duration::from_millis(150))
            .is_empty());
    }

    #[test]
    fn polling_ignores_partially_visible_rows() {
        let (doc, target, _) = surface(2);
        let layout = Layout::compute(&doc, target);
        let mut observer = PollingObserver::new(Duration::from_millis(100));
        let start = Instant::now();
        observer.connect(start);
        let snapshot = ViewportSnapshot {
            doc: &doc,
            layout: &layout,
            root: target,
            viewport: Viewport::new(0, 2),
        };
        assert!(observer
            .on_tick(&snapshot, start + Duration::from_secs(1))
            .is_empty());
    }

    #[test]
    fn polling_timer_is_created_once_and_disposable() {
        let mut observer = PollingObserver::new(Duration::from_millis(100));
        let start = Instant::now();
        observer.connect(start);
        let due = observer.next_due();
        observer.disconnect();
        observer.connect(start + Duration::from_secs(5));
        assert_eq!(observer.next_due(), due);

        observer.dispose();
        assert!(!observer.is_armed());
        observer.connect(start);
        assert!(!observer.is_armed());
    }
}
