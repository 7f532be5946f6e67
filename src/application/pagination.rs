//! Page-number pagination shared by every feed.
//!
//! Requests carry a 1-based `?page=` parameter. Anything that does not parse
//! as an integer selects the first page; integers outside the available range
//! clamp to the nearest page instead of failing. A collection with no items
//! still has exactly one (empty) page.

/// Fixed number of posts per feed page.
pub const POSTS_PER_PAGE: u64 = 10;

const PAGE_PARAM: &str = "page";

/// A requested page number before it is resolved against a collection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(i64);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    /// Absent or non-integer input selects the first page. Integers too large
    /// for `i64` saturate so they still clamp to the last page.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return Self::FIRST;
        };
        match value.parse::<i64>() {
            Ok(number) => PageNumber(number),
            Err(_) if is_integer_literal(value) => {
                if value.starts_with('-') {
                    PageNumber(i64::MIN)
                } else {
                    PageNumber(i64::MAX)
                }
            }
            Err(_) => Self::FIRST,
        }
    }

    /// Page selected by a raw query string. When `page` repeats, the last
    /// occurrence wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let raw = query.and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .filter(|(key, _)| key == PAGE_PARAM)
                .map(|(_, value)| value.into_owned())
                .last()
        });
        Self::parse(raw.as_deref())
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

/// A page number resolved against a known total, with the slice bounds to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn resolve(total: u64, requested: PageNumber, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let number = match requested.get() {
            n if n < 1 => 1,
            n => (n as u64).min(num_pages),
        };
        let offset = (number - 1) * per_page;

        Self {
            number,
            num_pages,
            total,
            offset,
            limit: per_page,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// One page of items plus the navigation metadata templates need.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then_some(self.number - 1)
    }

    /// Whether more than one page exists, so navigation should be shown.
    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

/// Window an already-ordered collection in memory.
pub fn paginate<T>(items: Vec<T>, requested: PageNumber, per_page: u64) -> Page<T> {
    let window = PageWindow::resolve(items.len() as u64, requested, per_page);
    let slice = items
        .into_iter()
        .skip(window.offset as usize)
        .take(window.limit as usize)
        .collect();
    Page::new(slice, window)
}
