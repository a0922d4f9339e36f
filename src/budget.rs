/// Result of a bounded fill loop.
#[derive(Debug, Clone)]
pub struct Budgeted<T> {
    pub accepted: Vec<T>,
    pub attempts: usize,
}

impl<T> Budgeted<T> {
    pub fn shortfall(&self, target: usize) -> usize {
        target.saturating_sub(self.accepted.len())
    }
}

/// Draw candidates until `accepted` holds `target` items or `max_attempts`
/// draws have been spent. `draw` sees what has been accepted so far and
/// returns `None` to reject the attempt.
pub fn fill_with_budget<T, F>(
    mut accepted: Vec<T>,
    target: usize,
    max_attempts: usize,
    mut draw: F,
) -> Budgeted<T>
where
    F: FnMut(&[T]) -> Option<T>,
{
    let mut attempts = 0;
    while accepted.len() < target && attempts < max_attempts {
        attempts += 1;
        if let Some(item) = draw(&accepted) {
            accepted.push(item);
        }
    }
    Budgeted { accepted, attempts }
}

/// Single-item form of [`fill_with_budget`].
pub fn redraw<T, F>(max_attempts: usize, mut draw: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    fill_with_budget(Vec::with_capacity(1), 1, max_attempts, |_| draw())
        .accepted
        .pop()
}
