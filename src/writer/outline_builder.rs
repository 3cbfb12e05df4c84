//! Document outline (bookmarks) builder for PDF generation.
//!
//! Bookmarks are recorded as a flat list in insertion order, each with a
//! nesting level. The tree links (parent, first/last child, prev/next
//! sibling) are computed in a single forward pass when the outline is
//! written, keeping the last node seen at every level.
//!
//! # Example
//!
//! ```ignore
//! use pdf_quill::writer::OutlineBuilder;
//!
//! let mut outline = OutlineBuilder::new();
//! outline.add("Chapter 1", 0, 0.0, 1);
//! outline.add("Section 1.1", 1, 40.0, 1);
//! outline.add("Chapter 2", 0, 0.0, 2);
//! ```

use super::encoding;
use super::links::xyz_destination;
use super::object_serializer::ObjectSerializer as S;
use super::pdf_writer::ObjectWriter;
use crate::error::Result;
use log::debug;

/// A single outline item (bookmark).
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineItem {
    /// Display title
    pub title: String,
    /// Nesting level, 0 for top-level items
    pub level: usize,
    /// Target y in user units from the top of the page
    pub y: f64,
    /// Target page, 1-based
    pub page: usize,
}

/// Tree links of one item. `None` for `parent` means the outline root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlineLinks {
    /// Parent item
    pub parent: Option<usize>,
    /// Previous sibling
    pub prev: Option<usize>,
    /// Next sibling
    pub next: Option<usize>,
    /// First child
    pub first: Option<usize>,
    /// Last child
    pub last: Option<usize>,
}

/// Builder for document outlines (bookmarks).
#[derive(Debug, Clone, Default)]
pub struct OutlineBuilder {
    items: Vec<OutlineItem>,
}

impl OutlineBuilder {
    /// Create a new outline builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bookmark. A level deeper than one below the previous item
    /// is clamped so every item has a parent.
    pub fn add(&mut self, title: impl Into<String>, level: usize, y: f64, page: usize) -> &mut Self {
        let max_level = self.items.last().map_or(0, |prev| prev.level + 1);
        self.items.push(OutlineItem {
            title: title.into(),
            level: level.min(max_level),
            y,
            page,
        });
        self
    }

    /// Check if the outline is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[OutlineItem] {
        &self.items
    }

    /// Compute the tree links. The second value is the root's last child.
    pub fn link(&self) -> (Vec<OutlineLinks>, Option<usize>) {
        let mut links = vec![OutlineLinks::default(); self.items.len()];
        let mut lru: Vec<usize> = Vec::new();
        let mut level = 0;
        for (i, item) in self.items.iter().enumerate() {
            if item.level > 0 {
                let parent = lru[item.level - 1];
                links[i].parent = Some(parent);
                links[parent].last = Some(i);
                if item.level > level {
                    links[parent].first = Some(i);
                }
            }
            if item.level <= level && i > 0 {
                let prev = lru[item.level];
                links[prev].next = Some(i);
                links[i].prev = Some(prev);
            }
            lru.truncate(item.level);
            lru.push(i);
            level = item.level;
        }
        (links, lru.first().copied())
    }

    /// Write one object per item followed by the outline root.
    ///
    /// Returns the root's object number, or `None` when there are no
    /// bookmarks.
    pub fn put(
        &self,
        w: &mut ObjectWriter,
        page_height: impl Fn(usize) -> f64,
        k: f64,
        unicode: bool,
    ) -> Result<Option<u32>> {
        if self.items.is_empty() {
            return Ok(None);
        }
        let (links, root_last) = self.link();
        let base = w.next_id();
        let root_id = base + self.items.len() as u32;
        let id = |i: usize| S::reference(base + i as u32);

        for (item, link) in self.items.iter().zip(&links) {
            let mut entries = vec![
                ("Title", S::string(&encoding::text_string(&item.title, unicode))),
                ("Parent", link.parent.map_or_else(|| S::reference(root_id), id)),
            ];
            for (key, target) in [("Prev", link.prev), ("Next", link.next), ("First", link.first), ("Last", link.last)] {
                if let Some(t) = target {
                    entries.push((key, id(t)));
                }
            }
            entries.push(("Dest", xyz_destination(item.page, page_height(item.page) - item.y * k)));
            entries.push(("Count", S::integer(0)));
            w.put(&S::dict(entries))?;
        }

        let mut root = vec![("Type", S::name("Outlines")), ("First", id(0))];
        if let Some(last) = root_last {
            root.push(("Last", id(last)));
        }
        let n = w.put(&S::dict(root))?;
        debug!("wrote {} bookmarks, outline root {}", self.items.len(), n);
        Ok(Some(n))
    }
}

/// Resolve an item's destination page height, defaulting to zero for pages
/// that do not exist.
pub fn page_height_or_zero(heights: &[f64]) -> impl Fn(usize) -> f64 + '_ {
    move |p| p.checked_sub(1).and_then(|i| heights.get(i)).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn outline(levels: &[usize]) -> OutlineBuilder {
        let mut outline = OutlineBuilder::new();
        for (i, level) in levels.iter().enumerate() {
            outline.add(format!("item {}", i), *level, 0.0, 1);
        }
        outline
    }

    #[test]
    fn test_two_chapters_with_sections() {
        let (links, last) = outline(&[0, 1, 1, 0]).link();
        assert_eq!(last, Some(3));
        assert_eq!(links[0].first, Some(1));
        assert_eq!(links[0].last, Some(2));
        assert_eq!(links[0].next, Some(3));
        assert_eq!(links[1].parent, Some(0));
        assert_eq!(links[1].next, Some(2));
        assert_eq!(links[2].prev, Some(1));
        assert_eq!(links[3].prev, Some(0));
        assert_eq!(links[3].parent, None);
    }

    #[test]
    fn test_level_jump_is_clamped() {
        let outline = outline(&[2, 5]);
        assert_eq!(outline.items()[0].level, 0);
        assert_eq!(outline.items()[1].level, 1);
    }

    #[test]
    fn test_put_objects() {
        let outline = outline(&[0, 1]);
        let mut w = ObjectWriter::new();
        let root = outline.put(&mut w, |_| 842.0, 1.0, false).unwrap();
        assert_eq!(root, Some(5));
        let out = String::from_utf8_lossy(w.as_bytes()).into_owned();
        assert!(out.contains("3 0 obj\n<</Title (item 0) /Parent 5 0 R /First 4 0 R /Last 4 0 R /Dest [3 0 R /XYZ 0 842 null] /Count 0>>"));
        assert!(out.contains("<</Type /Outlines /First 3 0 R /Last 3 0 R>>"));
    }

    #[test]
    fn test_empty_outline_writes_nothing() {
        let mut w = ObjectWriter::new();
        assert_eq!(OutlineBuilder::new().put(&mut w, |_| 0.0, 1.0, false).unwrap(), None);
        assert!(w.as_bytes().is_empty());
    }

    proptest! {
        #[test]
        fn prop_outline_is_a_tree(levels in proptest::collection::vec(0usize..5, 1..40)) {
            let outline = outline(&levels);
            let (links, root_last) = outline.link();
            let n = links.len();

            // The root's children are the level 0 items
            let mut seen = vec![false; n];
            let mut stack = vec![0usize];
            let mut visited = 0;
            while let Some(start) = stack.pop() {
                let mut cur = Some(start);
                while let Some(i) = cur {
                    prop_assert!(!seen[i], "node {} visited twice", i);
                    seen[i] = true;
                    visited += 1;
                    if let Some(child) = links[i].first {
                        prop_assert_eq!(links[child].parent, Some(i));
                        stack.push(child);
                    }
                    if links[i].next.is_none() && links[i].parent.is_none() {
                        prop_assert_eq!(root_last, Some(i));
                    }
                    cur = links[i].next;
                }
            }
            prop_assert_eq!(visited, n);
        }
    }
}
