use crate::models::event::Event;

/// Free-text search plus location narrowing, both case-insensitive.
///
/// An event matches when the query is empty or found in its title or
/// description, and the location filter is empty or found in its location.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    query: String,
    location: String,
}

impl EventFilter {
    pub fn new(query: &str, location: &str) -> Self {
        Self {
            query: query.to_lowercase(),
            location: location.to_lowercase(),
        }
    }

    pub fn by_location(location: &str) -> Self {
        Self::new("", location)
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.location.is_empty()
    }

    pub fn matches(&self, event: &Event) -> bool {
        let matches_search = self.query.is_empty()
            || event.title.to_lowercase().contains(&self.query)
            || event.description.to_lowercase().contains(&self.query);

        let matches_location =
            self.location.is_empty() || event.location.to_lowercase().contains(&self.location);

        matches_search && matches_location
    }

    /// Keeps matching events, preserving their order.
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        if self.is_empty() {
            return events;
        }
        events.into_iter().filter(|e| self.matches(e)).collect()
    }
}
