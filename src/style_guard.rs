//! Style isolation for deterministic captures
//!
//! Hover transforms, running transitions and elevated shadows would end up
//! baked into the bitmap. [`StyleGuard::acquire`] replaces them with fixed
//! values and the guard puts the original inline values back when it is
//! released or dropped, whichever comes first.

use crate::surface::CardSurface;

/// Class added to the surface while a capture is running
pub const EXPORT_MODE_CLASS: &str = "export-mode";

/// Inline properties neutralized during capture, with their capture-safe values.
pub const ISOLATED_PROPERTIES: [(&str, &str); 4] = [
    ("transform", "none"),
    ("transition", "none"),
    ("cursor", "default"),
    ("box-shadow", "0 10px 25px -5px rgba(0, 0, 0, 0.25)"),
];

/// Pre-capture inline values of [`ISOLATED_PROPERTIES`], in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSnapshot {
    values: Vec<(&'static str, Option<String>)>,
}

impl StyleSnapshot {
    fn take(target: &dyn CardSurface) -> Self {
        let values = ISOLATED_PROPERTIES
            .iter()
            .map(|(prop, _)| (*prop, target.inline_style(prop)))
            .collect();
        Self { values }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| *p == property)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// Scoped style override on a surface. Restores on drop.
pub struct StyleGuard<'a> {
    target: &'a dyn CardSurface,
    snapshot: Option<StyleSnapshot>,
}

impl<'a> StyleGuard<'a> {
    pub fn acquire(target: &'a dyn CardSurface) -> Self {
        let snapshot = StyleSnapshot::take(target);
        for (prop, value) in ISOLATED_PROPERTIES {
            target.set_inline_style(prop, value);
        }
        target.add_class(EXPORT_MODE_CLASS);
        log::debug!("Card prepared for export");
        Self {
            target,
            snapshot: Some(snapshot),
        }
    }

    pub fn snapshot(&self) -> Option<&StyleSnapshot> {
        self.snapshot.as_ref()
    }

    /// Restore now instead of at end of scope.
    pub fn release(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        for (prop, original) in snapshot.values {
            match original {
                Some(v) => self.target.set_inline_style(prop, &v),
                None => self.target.remove_inline_style(prop),
            }
        }
        self.target.remove_class(EXPORT_MODE_CLASS);
        log::debug!("Styles restored");
    }
}

impl Drop for StyleGuard<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
