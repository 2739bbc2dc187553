use tracing::debug;

/// The currently chosen category, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    value: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A selection already holding `value`.
    pub fn with_value(value: Option<&str>) -> Self {
        Self { value: value.map(str::to_string) }
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Select `category`, or clear when it is already selected.
    pub fn toggle(&mut self, category: &str) {
        if self.value.as_deref() == Some(category) {
            self.value = None;
        } else {
            self.value = Some(category.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Filter predicate: equality when set, identity otherwise.
    pub fn matches(&self, category: &str) -> bool {
        self.value.as_deref().map_or(true, |selected| selected == category)
    }
}

type Consumer = Box<dyn FnMut(Option<&str>)>;

/// Shares one [`Selection`] between a producer chart and its consumers.
///
/// Updates are synchronous: [`SelectionBridge::click`] returns only after
/// every consumer has observed the new value.
#[derive(Default)]
pub struct SelectionBridge {
    selection: Selection,
    consumers: Vec<Consumer>,
}

impl SelectionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, consumer: F)
    where
        F: FnMut(Option<&str>) + 'static,
    {
        self.consumers.push(Box::new(consumer));
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current(&self) -> Option<&str> {
        self.selection.get()
    }

    /// Toggle `category` and notify every consumer.
    pub fn click(&mut self, category: &str) -> Option<&str> {
        self.selection.toggle(category);
        debug!(selection = ?self.selection.get(), consumers = self.consumers.len(), "selection changed");
        self.notify();
        self.selection.get()
    }

    pub fn clear(&mut self) {
        if self.selection.get().is_some() {
            self.selection.clear();
            self.notify();
        }
    }

    fn notify(&mut self) {
        let value = self.selection.get();
        for consumer in &mut self.consumers {
            consumer(value);
        }
    }
}

impl std::fmt::Debug for SelectionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionBridge")
            .field("selection", &self.selection)
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_toggle_sequence() {
        let mut s = Selection::new();
        assert_eq!(s.get(), None);
        s.toggle("red");
        assert_eq!(s.get(), Some("red"));
        s.toggle("red");
        assert_eq!(s.get(), None);
        s.toggle("red");
        s.toggle("blue");
        assert_eq!(s.get(), Some("blue"));
    }

    #[test]
    fn test_with_value() {
        assert_eq!(Selection::with_value(None), Selection::new());
        let s = Selection::with_value(Some("black"));
        assert!(s.matches("black"));
        assert!(!s.matches("white"));
    }

    #[test]
    fn test_predicate() {
        let mut s = Selection::new();
        assert!(s.matches("anything"));
        s.toggle("red");
        assert!(s.matches("red"));
        assert!(!s.matches("blue"));
    }

    #[test]
    fn test_all_consumers_observe_before_click_returns() {
        let seen: Rc<RefCell<Vec<(usize, Option<String>)>>> = Rc::default();
        let mut bridge = SelectionBridge::new();
        for id in 0..2 {
            let seen = Rc::clone(&seen);
            bridge.subscribe(move |v| seen.borrow_mut().push((id, v.map(str::to_string))));
        }

        assert_eq!(bridge.click("red"), Some("red"));
        assert_eq!(
            *seen.borrow(),
            vec![(0, Some("red".to_string())), (1, Some("red".to_string()))]
        );

        bridge.click("red");
        assert_eq!(bridge.current(), None);
        assert_eq!(seen.borrow().len(), 4);
        assert_eq!(seen.borrow()[3], (1, None));
    }

    #[test]
    fn test_clear_without_selection_is_silent() {
        let calls = Rc::new(RefCell::new(0));
        let mut bridge = SelectionBridge::new();
        let c = Rc::clone(&calls);
        bridge.subscribe(move |_| *c.borrow_mut() += 1);
        bridge.clear();
        assert_eq!(*calls.borrow(), 0);
    }
}
