//! Priority ordering shared by generators and compilers.
//!
//! Higher priorities run (or win) first. Plugins with equal priority keep the
//! order in which they were registered, so a run is reproducible as long as
//! registration order is.

/// Generators producing pages that content pages depend on, like global assets.
pub const PRIORITY_INIT: i32 = 10_000;

/// Generators producing content pages.
pub const PRIORITY_EARLY: i32 = 1_000;

/// Generators building pages from data indexed by content pages.
pub const PRIORITY_DEFAULT: i32 = 100;

/// Generators producing assets or data files.
pub const PRIORITY_LATE: i32 = 10;

/// Indices of `priorities` ordered from highest to lowest priority.
///
/// The sort is stable: equal priorities stay in iteration (registration) order.
pub fn priority_order<I>(priorities: I) -> Vec<usize>
where
    I: IntoIterator<Item = i32>,
{
    let mut order: Vec<(usize, i32)> = priorities.into_iter().enumerate().collect();
    order.sort_by_key(|&(_, priority)| std::cmp::Reverse(priority));
    order.into_iter().map(|(index, _)| index).collect()
}
