//! Threat tracking for actors

use realm_core::SessionId;

/// One attacker in an actor's threat list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opponent {
    pub session: SessionId,
    /// Total damage dealt to the actor
    pub damage: u32,
    /// Ticks since this opponent last dealt damage
    pub idle_ticks: u32,
}

/// Ordered set of opponents keyed by session id.
///
/// Insertion order breaks ties between equal damage totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Opponents {
    entries: Vec<Opponent>,
}

impl Opponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add damage for `session`, creating the entry if needed, and reset
    /// its idle counter.
    pub fn add_damage(&mut self, session: SessionId, damage: u32) {
        match self.entries.iter_mut().find(|o| o.session == session) {
            Some(entry) => {
                entry.damage = entry.damage.saturating_add(damage);
                entry.idle_ticks = 0;
            }
            None => self.entries.push(Opponent { session, damage, idle_ticks: 0 }),
        }
    }

    /// Advance every idle counter by one tick and drop entries idle for
    /// more than `boredom_ticks`. Returns how many were dropped.
    pub fn age_and_prune(&mut self, boredom_ticks: u32) -> usize {
        let before = self.entries.len();
        for entry in &mut self.entries {
            entry.idle_ticks = entry.idle_ticks.saturating_add(1);
        }
        self.entries.retain(|o| o.idle_ticks <= boredom_ticks);
        before - self.entries.len()
    }

    pub fn remove(&mut self, session: SessionId) -> Option<Opponent> {
        let index = self.entries.iter().position(|o| o.session == session)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, session: SessionId) -> Option<&Opponent> {
        self.entries.iter().find(|o| o.session == session)
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.get(session).is_some()
    }

    /// Highest cumulative damage among the entries accepted by `filter`.
    pub fn strongest_where<F>(&self, mut filter: F) -> Option<&Opponent>
    where
        F: FnMut(&Opponent) -> bool,
    {
        self.entries
            .iter()
            .filter(|o| filter(o))
            .fold(None, |best: Option<&Opponent>, o| match best {
                Some(b) if b.damage >= o.damage => Some(b),
                _ => Some(o),
            })
    }

    /// The opponent that dealt the most damage overall.
    pub fn strongest(&self) -> Option<&Opponent> {
        self.strongest_where(|_| true)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Opponent> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
