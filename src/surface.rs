//! Card surfaces: the renderable region an export captures
//!
//! A surface plays the role of the live card preview element. It exposes its
//! observed pixel size, a writable set of inline style overrides, a class
//! list, and the display list the rasterizer paints from.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::rendering::paint::PaintCommand;
use crate::Size;

/// A mounted, styled region of the visual tree that can be captured.
///
/// Methods take `&self`; implementations use interior mutability the way a
/// DOM node is shared and mutated in place.
pub trait CardSurface: Send + Sync {
    /// Whether the surface is currently attached to a rendered tree
    fn is_mounted(&self) -> bool {
        true
    }

    /// Rendered size in CSS pixels at the time of the call
    fn offset_size(&self) -> Size;

    /// Current inline value of a CSS property (`box-shadow`, `transform`, ...)
    fn inline_style(&self, property: &str) -> Option<String>;

    fn set_inline_style(&self, property: &str, value: &str);

    fn remove_inline_style(&self, property: &str);

    fn add_class(&self, class: &str);

    fn remove_class(&self, class: &str);

    /// Paint commands in surface coordinates (CSS pixels)
    fn display_list(&self) -> Vec<PaintCommand>;
}

#[derive(Debug, Default)]
struct ElementState {
    size: Size,
    mounted: bool,
    styles: BTreeMap<String, String>,
    classes: Vec<String>,
    mutations: usize,
}

/// In-memory card element used by the CLI, the self check, and tests.
#[derive(Debug)]
pub struct CardElement {
    state: Mutex<ElementState>,
    display_list: Vec<PaintCommand>,
}

impl CardElement {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(ElementState {
                size: Size { width, height },
                mounted: true,
                ..Default::default()
            }),
            display_list: Vec::new(),
        }
    }

    pub fn with_display_list(mut self, commands: Vec<PaintCommand>) -> Self {
        self.display_list = commands;
        self
    }

    /// Seed an inline style without counting it as a mutation.
    pub fn with_style(self, property: &str, value: &str) -> Self {
        self.lock().styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.lock().size = Size { width, height };
    }

    pub fn unmount(&self) {
        self.lock().mounted = false;
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.lock().classes.iter().any(|c| c == class)
    }

    /// Snapshot of every inline style currently set
    pub fn inline_styles(&self) -> BTreeMap<String, String> {
        self.lock().styles.clone()
    }

    /// Number of style or class writes since creation
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    fn lock(&self) -> MutexGuard<'_, ElementState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CardSurface for CardElement {
    fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    fn offset_size(&self) -> Size {
        self.lock().size
    }

    fn inline_style(&self, property: &str) -> Option<String> {
        self.lock().styles.get(property).cloned()
    }

    fn set_inline_style(&self, property: &str, value: &str) {
        let mut s = self.lock();
        s.styles.insert(property.to_string(), value.to_string());
        s.mutations += 1;
    }

    fn remove_inline_style(&self, property: &str) {
        let mut s = self.lock();
        s.styles.remove(property);
        s.mutations += 1;
    }

    fn add_class(&self, class: &str) {
        let mut s = self.lock();
        if !s.classes.iter().any(|c| c == class) {
            s.classes.push(class.to_string());
        }
        s.mutations += 1;
    }

    fn remove_class(&self, class: &str) {
        let mut s = self.lock();
        s.classes.retain(|c| c != class);
        s.mutations += 1;
    }

    fn display_list(&self) -> Vec<PaintCommand> {
        self.display_list.clone()
    }
}
