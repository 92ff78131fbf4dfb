//! ID allocation with reuse of released values

use parking_lot::Mutex;

struct PoolState {
    next: u32,
    released: Vec<u16>,
}

/// Thread-safe pool of 16-bit ids in `1..=max`.
///
/// Released ids are handed out again before fresh ones, lowest first.
pub struct IdPool {
    state: Mutex<PoolState>,
    max: u16,
}

impl IdPool {
    pub fn new(max: u16) -> Self {
        Self {
            state: Mutex::new(PoolState { next: 1, released: Vec::new() }),
            max,
        }
    }

    /// Take an id, or `None` once every id is in use.
    pub fn acquire(&self) -> Option<u16> {
        let mut state = self.state.lock();
        if let Some(id) = state.released.pop() {
            return Some(id);
        }
        if state.next > self.max as u32 {
            return None;
        }
        let id = state.next as u16;
        state.next += 1;
        Some(id)
    }

    /// Return an id to the pool. Ids never handed out are ignored.
    pub fn release(&self, id: u16) {
        let mut state = self.state.lock();
        if id == 0 || id as u32 >= state.next || state.released.contains(&id) {
            return;
        }
        state.released.push(id);
        // Kept in descending order so `pop` yields the lowest.
        state.released.sort_unstable_by(|a, b| b.cmp(a));
    }

    pub fn in_use(&self) -> usize {
        let state = self.state.lock();
        (state.next as usize - 1) - state.released.len()
    }
}

impl Default for IdPool {
    fn default() -> Self {
        Self::new(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let pool = IdPool::new(100);
        let id1 = pool.acquire().unwrap();
        let id2 = pool.acquire().unwrap();
        assert_ne!(id1, id2);
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_released_ids_are_reused_lowest_first() {
        let pool = IdPool::new(100);
        let ids: Vec<u16> = (0..5).filter_map(|_| pool.acquire()).collect();
        pool.release(ids[3]);
        pool.release(ids[1]);
        assert_eq!(pool.acquire(), Some(ids[1]));
        assert_eq!(pool.acquire(), Some(ids[3]));
        assert_eq!(pool.acquire(), Some(6));
    }

    #[test]
    fn test_exhaustion() {
        let pool = IdPool::new(2);
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_some());
        assert_eq!(pool.acquire(), None);
        pool.release(1);
        assert_eq!(pool.acquire(), Some(1));
    }

    #[test]
    fn test_double_release_is_ignored() {
        let pool = IdPool::new(10);
        let id = pool.acquire().unwrap();
        pool.release(id);
        pool.release(id);
        pool.release(9);
        assert_eq!(pool.in_use(), 0);
    }
}
