use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: usize,
    pub last_page: u32,
}

impl PaginationMeta {
    /// Meta for an empty result set, as used by fallback payloads.
    pub fn empty(page: u32, per_page: u32) -> Self {
        Self {
            current_page: page,
            per_page,
            total: 0,
            last_page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Rows that carry a display rank stable across pages.
pub trait Ranked {
    fn set_rank(&mut self, rank: usize);
}

/// Slice one page out of a fully materialized row set.
///
/// `total` and `last_page` always describe the whole set; a page past the
/// end yields no items rather than an error.
pub fn paginate<T>(rows: Vec<T>, page: u32, per_page: u32) -> PaginatedResult<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = rows.len();
    let last_page = (total.div_ceil(per_page as usize)).max(1) as u32;
    let offset = (page as usize - 1).saturating_mul(per_page as usize);

    let items = rows
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    PaginatedResult {
        items,
        pagination: PaginationMeta {
            current_page: page,
            per_page,
            total,
            last_page,
        },
    }
}

/// [`paginate`], then number the visible rows `offset + index + 1`.
pub fn paginate_ranked<T: Ranked>(rows: Vec<T>, page: u32, per_page: u32) -> PaginatedResult<T> {
    let mut result = paginate(rows, page, per_page);
    let offset = (result.pagination.current_page as usize)
        .saturating_sub(1)
        .saturating_mul(result.pagination.per_page as usize);
    for (index, item) in result.items.iter_mut().enumerate() {
        item.set_rank(offset + index + 1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: usize,
        rank: usize,
    }

    impl Ranked for Row {
        fn set_rank(&mut self, rank: usize) {
            self.rank = rank;
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n).map(|id| Row { id, rank: 0 }).collect()
    }

    #[test]
    fn last_partial_page() {
        let result = paginate(rows(25), 3, 10);
        assert_eq!(result.items.len(), 5);
        assert_eq!(result.pagination.total, 25);
        assert_eq!(result.pagination.last_page, 3);
        assert_eq!(result.pagination.current_page, 3);
        assert_eq!(result.items[0].id, 20);
    }

    #[test]
    fn totals_do_not_depend_on_requested_page() {
        for page in 1..=5 {
            let result = paginate(rows(25), page, 10);
            assert_eq!(result.pagination.total, 25);
            assert_eq!(result.pagination.last_page, 3);
        }
    }

    #[test]
    fn out_of_range_page_is_empty_not_an_error() {
        let result = paginate(rows(25), 9, 10);
        assert!(result.items.is_empty());
        assert_eq!(result.pagination.total, 25);
    }

    #[test]
    fn empty_set_has_one_page() {
        let result = paginate(Vec::<Row>::new(), 1, 10);
        assert_eq!(result.pagination.last_page, 1);
        assert_eq!(result.pagination.total, 0);
    }

    #[test]
    fn ranks_continue_across_pages() {
        let result = paginate_ranked(rows(25), 2, 10);
        let ranks: Vec<usize> = result.items.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (11..=20).collect::<Vec<_>>());
    }
}
