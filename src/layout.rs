//! Collaborator interfaces for size negotiation and repainting.
//!
//! The window core never lays out or paints contained widgets itself. It asks a
//! [`LayoutEngine`] for preferred sizes and hands it allocations, and it asks a
//! [`Renderer`] to repaint surfaces. [`BoxLayout`] is a small vertical-box engine
//! and [`DamageLog`] a recording renderer, both used by the headless demo and the
//! test suite.

use log::trace;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::geometry::Rectangle;
use crate::platform::SurfaceHandle;

/// Opaque widget identifier understood by the layout engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which dimension a widget negotiates first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    #[default]
    ConstantSize,
    HeightForWidth,
    WidthForHeight,
}

/// Minimum and natural size of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeRequest {
    pub min_width: i32,
    pub natural_width: i32,
    pub min_height: i32,
    pub natural_height: i32,
}

impl SizeRequest {
    pub fn fixed(width: i32, height: i32) -> Self {
        Self {
            min_width: width,
            natural_width: width,
            min_height: height,
            natural_height: height,
        }
    }
}

/// Preferred-size queries and allocation for the widgets inside a window
#[cfg_attr(test, mockall::automock)]
pub trait LayoutEngine {
    fn request_mode(&self, widget: WidgetId) -> RequestMode;

    /// Minimum and natural size including any explicit size request
    fn measure(&self, widget: WidgetId) -> SizeRequest;

    /// `(minimum, natural)` width when constrained to `height`
    fn preferred_width_for_height(&self, widget: WidgetId, height: i32) -> (i32, i32);

    /// `(minimum, natural)` height when constrained to `width`
    fn preferred_height_for_width(&self, widget: WidgetId, width: i32) -> (i32, i32);

    /// Current explicit size request, `-1` meaning unset
    fn size_request(&self, widget: WidgetId) -> (i32, i32);

    fn set_size_request(&mut self, widget: WidgetId, width: i32, height: i32);

    fn allocate(&mut self, widget: WidgetId, allocation: Rectangle);

    /// Whether the widget asked for a new allocation since the last one
    fn needs_allocation(&self, widget: WidgetId) -> bool;

    /// Outermost ancestor of `widget`, or the widget itself
    fn toplevel_of(&self, widget: WidgetId) -> WidgetId;

    fn is_ancestor(&self, widget: WidgetId, ancestor: WidgetId) -> bool;

    fn first_focusable(&self, widget: WidgetId) -> Option<WidgetId>;
}

/// Paint requests
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    /// Repaint `region` of the surface, or all of it when `None`
    fn invalidate(&mut self, surface: SurfaceHandle, region: Option<Rectangle>);
}

/// Renderer that only records which surfaces were invalidated
#[derive(Debug, Clone, Default)]
pub struct DamageLog {
    damage: Arc<Mutex<Vec<(SurfaceHandle, Option<Rectangle>)>>>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidations of `surface` since the last call
    pub fn take_for(&self, surface: SurfaceHandle) -> usize {
        let mut damage = self.damage.lock();
        let before = damage.len();
        damage.retain(|(s, _)| *s != surface);
        before - damage.len()
    }

    pub fn total(&self) -> usize {
        self.damage.lock().len()
    }
}

impl Renderer for DamageLog {
    fn invalidate(&mut self, surface: SurfaceHandle, region: Option<Rectangle>) {
        trace!("Damage on surface {}: {:?}", surface, region);
        self.damage.lock().push((surface, region));
    }
}

/// A widget node in [`BoxLayout`]
#[derive(Debug, Clone, Default)]
struct BoxNode {
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    /// Own content size (leaves) or chrome around the children (containers)
    content: SizeRequest,
    border: i32,
    spacing: i32,
    size_request: (i32, i32),
    focusable: bool,
    allocation: Option<Rectangle>,
    needs_allocation: bool,
}

#[derive(Debug, Default)]
struct BoxLayoutState {
    nodes: HashMap<WidgetId, BoxNode>,
}

/// Vertical-box layout engine with shared state.
///
/// Clones share the same widget tree so a caller can keep a handle after giving
/// one to the registry.
#[derive(Debug, Clone, Default)]
pub struct BoxLayout {
    state: Arc<Mutex<BoxLayoutState>>,
}

impl BoxLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container with a border and spacing between children
    pub fn add_container(&self, widget: WidgetId, parent: Option<WidgetId>, border: i32, spacing: i32) {
        self.insert(
            widget,
            parent,
            BoxNode {
                border,
                spacing,
                ..BoxNode::default()
            },
        );
    }

    /// Add a leaf widget with fixed minimum and natural sizes
    pub fn add_leaf(&self, widget: WidgetId, parent: Option<WidgetId>, content: SizeRequest, focusable: bool) {
        self.insert(
            widget,
            parent,
            BoxNode {
                content,
                focusable,
                ..BoxNode::default()
            },
        );
    }

    fn insert(&self, widget: WidgetId, parent: Option<WidgetId>, mut node: BoxNode) {
        let mut state = self.state.lock();
        node.parent = parent;
        node.size_request = (-1, -1);
        node.needs_allocation = true;
        if let Some(parent) = parent {
            if let Some(parent_node) = state.nodes.get_mut(&parent) {
                parent_node.children.push(widget);
            }
        }
        state.nodes.insert(widget, node);
    }

    /// Change a leaf's content size, as a label would after its text changed
    pub fn set_content(&self, widget: WidgetId, content: SizeRequest) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(&widget) {
            node.content = content;
        }
        Self::mark_needs_allocation(&mut state, widget);
    }

    /// Last allocation handed to `widget`
    pub fn allocation(&self, widget: WidgetId) -> Option<Rectangle> {
        self.state.lock().nodes.get(&widget).and_then(|n| n.allocation)
    }

    fn mark_needs_allocation(state: &mut BoxLayoutState, widget: WidgetId) {
        let mut current = Some(widget);
        while let Some(id) = current {
            current = match state.nodes.get_mut(&id) {
                Some(node) => {
                    node.needs_allocation = true;
                    node.parent
                }
                None => None,
            };
        }
    }

    fn measure_node(state: &BoxLayoutState, widget: WidgetId) -> SizeRequest {
        let Some(node) = state.nodes.get(&widget) else {
            return SizeRequest::default();
        };

        let mut request = if node.children.is_empty() {
            node.content
        } else {
            let mut req = SizeRequest::default();
            for child in &node.children {
                let child_req = Self::measure_node(state, *child);
                req.min_width = req.min_width.max(child_req.min_width);
                req.natural_width = req.natural_width.max(child_req.natural_width);
                req.min_height += child_req.min_height;
                req.natural_height += child_req.natural_height;
            }
            let gaps = node.spacing * (node.children.len() as i32 - 1);
            req.min_height += gaps;
            req.natural_height += gaps;
            req
        };

        let (req_width, req_height) = node.size_request;
        if req_width >= 0 {
            request.min_width = request.min_width.max(req_width);
            request.natural_width = request.natural_width.max(req_width);
        }
        if req_height >= 0 {
            request.min_height = request.min_height.max(req_height);
            request.natural_height = request.natural_height.max(req_height);
        }

        let chrome = 2 * node.border;
        request.min_width += chrome;
        request.natural_width += chrome;
        request.min_height += chrome;
        request.natural_height += chrome;
        request
    }

    fn allocate_node(state: &mut BoxLayoutState, widget: WidgetId, allocation: Rectangle) {
        let (children, border, spacing) = match state.nodes.get_mut(&widget) {
            Some(node) => {
                node.allocation = Some(allocation);
                node.needs_allocation = false;
                (node.children.clone(), node.border, node.spacing)
            }
            None => return,
        };

        let width = (allocation.width - 2 * border).max(0);
        let mut y = allocation.y + border;
        for child in children {
            let height = Self::measure_node(state, child).natural_height;
            let child_alloc = Rectangle::new(allocation.x + border, y, width, height);
            Self::allocate_node(state, child, child_alloc);
            y += height + spacing;
        }
    }
}

impl LayoutEngine for BoxLayout {
    fn request_mode(&self, _widget: WidgetId) -> RequestMode {
        RequestMode::ConstantSize
    }

    fn measure(&self, widget: WidgetId) -> SizeRequest {
        Self::measure_node(&self.state.lock(), widget)
    }

    fn preferred_width_for_height(&self, widget: WidgetId, _height: i32) -> (i32, i32) {
        let req = self.measure(widget);
        (req.min_width, req.natural_width)
    }

    fn preferred_height_for_width(&self, widget: WidgetId, _width: i32) -> (i32, i32) {
        let req = self.measure(widget);
        (req.min_height, req.natural_height)
    }

    fn size_request(&self, widget: WidgetId) -> (i32, i32) {
        self.state
            .lock()
            .nodes
            .get(&widget)
            .map(|n| n.size_request)
            .unwrap_or((-1, -1))
    }

    fn set_size_request(&mut self, widget: WidgetId, width: i32, height: i32) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(&widget) {
            node.size_request = (width, height);
        }
        Self::mark_needs_allocation(&mut state, widget);
    }

    fn allocate(&mut self, widget: WidgetId, allocation: Rectangle) {
        trace!("Allocating widget {} at {:?}", widget, allocation);
        Self::allocate_node(&mut self.state.lock(), widget, allocation);
    }

    fn needs_allocation(&self, widget: WidgetId) -> bool {
        self.state
            .lock()
            .nodes
            .get(&widget)
            .map(|n| n.needs_allocation)
            .unwrap_or(false)
    }

    fn toplevel_of(&self, widget: WidgetId) -> WidgetId {
        let state = self.state.lock();
        let mut current = widget;
        while let Some(parent) = state.nodes.get(&current).and_then(|n| n.parent) {
            current = parent;
        }
        current
    }

    fn is_ancestor(&self, widget: WidgetId, ancestor: WidgetId) -> bool {
        let state = self.state.lock();
        let mut current = state.nodes.get(&widget).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = state.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn first_focusable(&self, widget: WidgetId) -> Option<WidgetId> {
        fn search(state: &BoxLayoutState, widget: WidgetId) -> Option<WidgetId> {
            let node = state.nodes.get(&widget)?;
            if node.focusable {
                return Some(widget);
            }
            node.children.iter().find_map(|child| search(state, *child))
        }
        search(&self.state.lock(), widget)
    }
}
