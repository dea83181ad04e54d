//! Shape registry: the one place shape-type polymorphism is resolved.
//!
//! Every shape is a data entry — default geometry, a style seed, and a
//! renderer selector — not a conditional branch in the controller. Unknown
//! tags resolve to the rectangle entry so a corrupt or future-versioned
//! diagram file still renders something.

use crate::id::{ElementId, LayerId, ShapeTag};
use crate::layers::default_layer;
use crate::model::{Element, Point, Size, Style};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Rendering behavior selector, consumed by the host's renderer. The
/// engine only routes it; geometry construction lives outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Rect,
    Ellipse,
    /// Regular polygon outline (diamond = 4, triangle = 3, ...).
    Polygon { sides: u8 },
    TextBlock,
    /// Freeform path shapes (arrows, brackets, generic flowchart glyphs).
    Path,
}

/// Registry entry for one shape tag.
#[derive(Debug, Clone)]
pub struct ShapeEntry {
    pub default_size: Size,
    pub style_seed: Style,
    pub renderer: RendererKind,
}

/// Caller-supplied overrides for [`ShapeRegistry::create_element`].
/// Explicit fields take precedence over registry defaults.
#[derive(Debug, Clone, Default)]
pub struct NewElement {
    pub position: Point,
    pub size: Option<Size>,
    pub label: Option<String>,
    pub style: Option<Style>,
    pub layer: Option<LayerId>,
}

/// Pure lookup table from shape tag to construction defaults and
/// rendering behavior. No state beyond the table itself.
pub struct ShapeRegistry {
    entries: HashMap<ShapeTag, ShapeEntry>,
    fallback: ShapeTag,
}

/// Process-wide registry instance. The table is fixed at startup; lookups
/// need no locking.
static REGISTRY: LazyLock<ShapeRegistry> = LazyLock::new(ShapeRegistry::builtin);

impl ShapeRegistry {
    /// The shared registry with the built-in shape set.
    pub fn global() -> &'static ShapeRegistry {
        &REGISTRY
    }

    fn builtin() -> Self {
        let mut entries = HashMap::new();
        let mut put = |tag: &str, size: (f32, f32), renderer: RendererKind, seed: Style| {
            entries.insert(
                ShapeTag::intern(tag),
                ShapeEntry {
                    default_size: Size::new(size.0, size.1),
                    style_seed: seed,
                    renderer,
                },
            );
        };

        let boxy = Style {
            fill: Some("#FFFFFF".into()),
            stroke: Some("#1A1A1A".into()),
            stroke_width: Some(2.0),
            ..Style::default()
        };
        let rounded = Style {
            corner_radius: Some(8.0),
            ..boxy.clone()
        };

        put("rectangle", (160.0, 90.0), RendererKind::Rect, rounded);
        put("circle", (90.0, 90.0), RendererKind::Ellipse, boxy.clone());
        put("ellipse", (140.0, 90.0), RendererKind::Ellipse, boxy.clone());
        put(
            "diamond",
            (120.0, 120.0),
            RendererKind::Polygon { sides: 4 },
            boxy.clone(),
        );
        put(
            "triangle",
            (110.0, 100.0),
            RendererKind::Polygon { sides: 3 },
            boxy.clone(),
        );
        put(
            "text",
            (120.0, 40.0),
            RendererKind::TextBlock,
            Style {
                font_family: Some("Inter".into()),
                font_size: Some(14.0),
                ..Style::default()
            },
        );

        // Generic-shape variants: flowchart, ER, arrows.
        put(
            "flow_process",
            (170.0, 70.0),
            RendererKind::Rect,
            boxy.clone(),
        );
        put(
            "flow_decision",
            (140.0, 110.0),
            RendererKind::Polygon { sides: 4 },
            boxy.clone(),
        );
        put(
            "flow_terminator",
            (150.0, 60.0),
            RendererKind::Rect,
            Style {
                corner_radius: Some(30.0),
                ..boxy.clone()
            },
        );
        put("er_entity", (160.0, 80.0), RendererKind::Rect, boxy.clone());
        put(
            "er_relation",
            (130.0, 100.0),
            RendererKind::Polygon { sides: 4 },
            boxy.clone(),
        );
        put("arrow", (140.0, 40.0), RendererKind::Path, boxy);

        Self {
            entries,
            fallback: ShapeTag::intern("rectangle"),
        }
    }

    /// Resolve a tag to its entry. Unknown tags fall back to the rectangle
    /// entry — never an error.
    pub fn resolve(&self, tag: ShapeTag) -> &ShapeEntry {
        self.entries.get(&tag).unwrap_or_else(|| {
            log::debug!("unknown shape tag {tag}, falling back to rectangle");
            &self.entries[&self.fallback]
        })
    }

    /// The tag an element will actually carry: unknown tags are rewritten
    /// to the fallback so downstream code never re-resolves them.
    pub fn canonical_tag(&self, tag: ShapeTag) -> ShapeTag {
        if self.entries.contains_key(&tag) {
            tag
        } else {
            self.fallback
        }
    }

    /// Build a fully-populated element from registry defaults overlaid with
    /// caller overrides.
    pub fn create_element(&self, tag: ShapeTag, options: NewElement) -> Element {
        let canonical = self.canonical_tag(tag);
        let entry = self.resolve(canonical);
        let mut element = Element::new(
            ElementId::fresh(canonical.as_str()),
            canonical,
            options.position,
            options.size.unwrap_or(entry.default_size),
        );
        element.style = options.style.unwrap_or_else(|| entry.style_seed.clone());
        element.label = options.label;
        element.layer = options.layer.unwrap_or_else(default_layer);
        element
    }
}
