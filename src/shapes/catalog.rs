use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A target shape: what the player sees and what the classifier calls it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Name shown to the player.
    pub display_name: String,
    /// Label in the classifier's vocabulary.
    pub classifier_label: String,
}

impl Shape {
    pub fn new(display_name: impl Into<String>, classifier_label: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            classifier_label: classifier_label.into(),
        }
    }

    /// Whether a classifier label refers to this shape.
    ///
    /// The classifier label is canonical; the display name is accepted as a
    /// fallback because some classifier deployments answer with display names.
    pub fn matches_label(&self, label: &str) -> bool {
        let label = label.trim();
        label.eq_ignore_ascii_case(&self.classifier_label)
            || label.eq_ignore_ascii_case(&self.display_name)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Errors raised by catalog construction and catalog-backed selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The catalog has no entries to choose from.
    #[error("Shape catalog is empty")]
    Empty,
    /// Two entries share a display name or classifier label.
    #[error("Duplicate shape {field} '{value}' in catalog")]
    Duplicate { field: &'static str, value: String },
}

/// Fixed, ordered registry of target shapes.
///
/// Order matters: it drives the daily rotation and breaks confidence ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCatalog {
    shapes: Vec<Shape>,
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self {
            shapes: vec![
                Shape::new("Circle", "sphere"),
                Shape::new("Square", "cube"),
                Shape::new("Cylinder", "cylinder"),
                Shape::new("Cone", "cone"),
                Shape::new("Triangle", "pyramid"),
                Shape::new("Donut", "torus"),
            ],
        }
    }
}

impl ShapeCatalog {
    /// Build a catalog from an explicit list, rejecting duplicate names or labels.
    pub fn new(shapes: Vec<Shape>) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        let mut labels = HashSet::new();
        for shape in &shapes {
            if !names.insert(shape.display_name.to_lowercase()) {
                return Err(CatalogError::Duplicate {
                    field: "display name",
                    value: shape.display_name.clone(),
                });
            }
            if !labels.insert(shape.classifier_label.to_lowercase()) {
                return Err(CatalogError::Duplicate {
                    field: "classifier label",
                    value: shape.classifier_label.clone(),
                });
            }
        }
        Ok(Self { shapes })
    }

    pub fn all(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn by_classifier_label(&self, label: &str) -> Option<&Shape> {
        self.shapes
            .iter()
            .find(|shape| shape.classifier_label.eq_ignore_ascii_case(label.trim()))
    }

    pub fn by_display_name(&self, name: &str) -> Option<&Shape> {
        self.shapes
            .iter()
            .find(|shape| shape.display_name.eq_ignore_ascii_case(name.trim()))
    }

    /// Find a shape by display name or classifier label, for user input.
    pub fn lookup(&self, name: &str) -> Option<&Shape> {
        self.by_display_name(name)
            .or_else(|| self.by_classifier_label(name))
    }

    /// Catalog position of the shape a classifier label refers to.
    pub(crate) fn position_of_label(&self, label: &str) -> Option<usize> {
        self.shapes.iter().position(|shape| shape.matches_label(label))
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index)
    }
}
