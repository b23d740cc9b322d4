//! Crossing detection between two orderings of the same items

/// Items that changed position between two orderings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cross<T> {
    /// Whether the fast and slow items took part in the cross
    pub fast_slow_cross: bool,
    /// The new ordering's slice covering every moved position, empty when
    /// nothing moved
    pub crossed: Vec<T>,
}

impl<T> Cross<T> {
    /// Whether anything moved
    pub fn is_cross(&self) -> bool {
        !self.crossed.is_empty()
    }
}

/// [`find_cross_by`] comparing the items themselves
pub fn find_cross<T: Clone + PartialEq>(prev: &[T], next: &[T], fast: &T, slow: &T) -> Cross<T> {
    find_cross_by(prev, next, fast, slow, |item| item.clone())
}

/// Find the contiguous region where `prev` and `next` disagree.
///
/// Positions are compared through `key`. The region runs from the first to
/// the last differing position, and `crossed` is `next`'s slice over it.
///
/// `fast_slow_cross` starts out true and is cleared as soon as `fast` or
/// `slow` is seen unchanged while scanning in from either end. It is a
/// single pass heuristic, not a check of where the two ended up.
pub fn find_cross_by<T, K, F>(prev: &[T], next: &[T], fast: &K, slow: &K, key: F) -> Cross<T>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let len = prev.len().min(next.len());
    let mut fast_slow_cross = true;
    let is_endpoint = |k: &K| k == fast || k == slow;

    let mut after = None;
    for r in (1..len).rev() {
        let k = key(&prev[r]);
        if k != key(&next[r]) {
            after = Some(r + 1);
            break;
        }
        if is_endpoint(&k) {
            fast_slow_cross = false;
        }
    }

    let Some(after) = after else {
        return Cross {
            fast_slow_cross: false,
            crossed: Vec::new(),
        };
    };

    let mut first = after;
    for l in 0..after {
        let k = key(&prev[l]);
        if k != key(&next[l]) {
            first = l;
            break;
        }
        if is_endpoint(&k) {
            fast_slow_cross = false;
        }
    }

    Cross {
        fast_slow_cross,
        crossed: next[first..after].to_vec(),
    }
}
