//! Link table and page link annotations.
//!
//! Internal links are created first with [`LinkTable::add`] and pointed at a
//! page position later with [`LinkTable::set`], so a table of contents can
//! link forward to pages that do not exist yet.

use super::encoding;
use super::object_serializer::ObjectSerializer as S;
use crate::object::Object;

/// Identifier of an internal link, starting at 1.
pub type LinkId = usize;

/// What a link rectangle points at.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Internal link created by [`LinkTable::add`]
    Internal(LinkId),
    /// External URL
    Url(String),
}

impl From<LinkId> for LinkTarget {
    fn from(id: LinkId) -> Self {
        LinkTarget::Internal(id)
    }
}

impl From<&str> for LinkTarget {
    fn from(url: &str) -> Self {
        LinkTarget::Url(url.to_string())
    }
}

impl From<String> for LinkTarget {
    fn from(url: String) -> Self {
        LinkTarget::Url(url)
    }
}

/// Destination of an internal link: page number (1-based) and y in user
/// units from the top of that page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkDest {
    /// Target page, 1-based
    pub page: usize,
    /// Target y in user units
    pub y: f64,
}

/// All internal link destinations of a document.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    dests: Vec<LinkDest>,
}

impl LinkTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new internal link pointing at the top of page 0 (unset).
    pub fn add(&mut self) -> LinkId {
        self.dests.push(LinkDest { page: 0, y: 0.0 });
        self.dests.len()
    }

    /// Point link `id` at (`page`, `y`). Returns false for an unknown id.
    pub fn set(&mut self, id: LinkId, page: usize, y: f64) -> bool {
        match id.checked_sub(1).and_then(|i| self.dests.get_mut(i)) {
            Some(dest) => {
                *dest = LinkDest { page, y };
                true
            },
            None => false,
        }
    }

    /// Destination of link `id`.
    pub fn get(&self, id: LinkId) -> Option<LinkDest> {
        id.checked_sub(1).and_then(|i| self.dests.get(i)).copied()
    }

    /// Number of internal links.
    pub fn len(&self) -> usize {
        self.dests.len()
    }

    /// Whether no internal link exists.
    pub fn is_empty(&self) -> bool {
        self.dests.is_empty()
    }
}

/// A clickable rectangle on a page, in points with the origin at the
/// bottom-left corner. `y` is the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub w: f64,
    /// Height
    pub h: f64,
    /// Target
    pub target: LinkTarget,
}

fn pt(v: f64) -> Object {
    S::real((v * 100.0).round() / 100.0)
}

/// Object number of the page dictionary for 1-based page `p`.
pub fn page_object_id(p: usize) -> u32 {
    (1 + 2 * p) as u32
}

/// `[page 0 R /XYZ 0 top null]` destination array.
pub fn xyz_destination(page: usize, top: f64) -> Object {
    S::array(vec![
        S::reference(page_object_id(page)),
        S::name("XYZ"),
        S::integer(0),
        pt(top),
        Object::Null,
    ])
}

impl PageLink {
    /// Link annotation dictionary.
    ///
    /// `page_height` gives the height in points of a 1-based page and `k`
    /// the scale factor. Internal links that were never set, or point at a
    /// page that does not exist, yield `None`.
    pub fn annotation(
        &self,
        links: &LinkTable,
        page_height: impl Fn(usize) -> Option<f64>,
        k: f64,
    ) -> Option<Object> {
        let mut entries = vec![
            ("Type", S::name("Annot")),
            ("Subtype", S::name("Link")),
            (
                "Rect",
                S::array(vec![pt(self.x), pt(self.y), pt(self.x + self.w), pt(self.y - self.h)]),
            ),
            ("Border", S::array(vec![S::integer(0), S::integer(0), S::integer(0)])),
        ];
        match &self.target {
            LinkTarget::Url(url) => {
                let uri = encoding::latin1(&encoding::code_points(url));
                entries.push(("A", S::dict(vec![("S", S::name("URI")), ("URI", S::string(&uri))])));
            },
            LinkTarget::Internal(id) => {
                let dest = links.get(*id)?;
                let h = page_height(dest.page)?;
                entries.push(("Dest", xyz_destination(dest.page, h - dest.y * k)));
            },
        }
        Some(S::dict(entries))
    }
}
