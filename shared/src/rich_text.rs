use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    Item,
    Fluid,
    Recipe,
}

impl IconKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(Self::Item),
            "fluid" => Some(Self::Fluid),
            "recipe" => Some(Self::Recipe),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Fluid => "fluid",
            Self::Recipe => "recipe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSegment {
    Text(String),
    Icon { kind: IconKind, name: String },
}

/// Split label text into plain runs and inline `[kind=name]` icon references.
///
/// Only item, fluid and recipe references are recognized; any other bracketed run stays text.
pub fn parse_rich_text(text: &str) -> Vec<LabelSegment> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let (before, from_open) = rest.split_at(open);
        plain.push_str(before);

        let Some(close) = from_open.find(']') else {
            rest = from_open;
            break;
        };
        let inner = &from_open[1..close];
        match icon_reference(inner) {
            Some(icon) => {
                if !plain.is_empty() {
                    segments.push(LabelSegment::Text(std::mem::take(&mut plain)));
                }
                segments.push(icon);
                rest = &from_open[close + 1..];
            }
            None => {
                plain.push('[');
                rest = &from_open[1..];
            }
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        segments.push(LabelSegment::Text(plain));
    }
    segments
}

fn icon_reference(inner: &str) -> Option<LabelSegment> {
    let (kind, name) = inner.split_once('=')?;
    let kind = IconKind::parse(kind.trim())?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(LabelSegment::Icon {
        kind,
        name: name.to_string(),
    })
}

/// Flatten segments for surfaces that cannot draw icons.
pub fn plain_text(segments: &[LabelSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            LabelSegment::Text(text) => out.push_str(text),
            LabelSegment::Icon { name, .. } => {
                out.push('[');
                out.push_str(name);
                out.push(']');
            }
        }
    }
    out
}
