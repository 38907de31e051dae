/// Handle returned by [`ObserverList::add`], used to remove the observer again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered list of registered observers.
///
/// Owned by whichever component fans events out (the relay hub for peers,
/// the command bridge for command callbacks). Ids are never reused.
pub struct ObserverList<T> {
    entries: Vec<(ObserverId, T)>,
    next_id: u64,
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> ObserverList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, returns its id
    pub fn add(&mut self, observer: T) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Remove an observer by id, returns it if it was registered
    pub fn remove(&mut self, id: ObserverId) -> Option<T> {
        let pos = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, id: ObserverId) -> Option<&T> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, observer)| observer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObserverId, &T)> {
        self.entries.iter().map(|(id, observer)| (*id, observer))
    }

    /// Drop every observer for which `keep` returns false
    pub fn retain(&mut self, mut keep: impl FnMut(ObserverId, &T) -> bool) {
        self.entries.retain(|(id, observer)| keep(*id, observer));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_keeps_order_and_ids() {
        let mut list = ObserverList::new();
        let a = list.add("a");
        let b = list.add("b");
        let c = list.add("c");

        assert_eq!(list.remove(b), Some("b"));
        assert_eq!(list.remove(b), None);
        let seen: Vec<_> = list.iter().map(|(_, v)| *v).collect();
        assert_eq!(seen, vec!["a", "c"]);

        let d = list.add("d");
        assert!(d != a && d != b && d != c);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn retain_drops_rejected() {
        let mut list = ObserverList::new();
        list.add(1);
        let two = list.add(2);
        list.add(3);
        list.retain(|_, v| *v != 2);
        assert!(list.get(two).is_none());
        assert_eq!(list.len(), 2);
    }
}
