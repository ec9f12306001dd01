//! The closed set of tags that reference fetchable resources

use crate::resource::ResourceType;
use scraper::node::Element;

/// A tag that may reference a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Link,
    Script,
    Image,
}

impl Tag {
    /// CSS selector matching every tag in the set, in document order
    pub const SELECTOR: &'static str = "link, script, img";

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "link" => Some(Self::Link),
            "script" => Some(Self::Script),
            "img" => Some(Self::Image),
            _ => None,
        }
    }

    /// Returns the raw reference and its kind, or `None` if the element
    /// does not point at a remote resource
    pub fn reference(self, element: &Element) -> Option<(String, ResourceType)> {
        match self {
            Self::Link => link_reference(element),
            Self::Script => src_reference(element, ResourceType::Script),
            Self::Image => src_reference(element, ResourceType::Image),
        }
    }
}

/// Stylesheets and icons; every other `rel` is ignored
fn link_reference(element: &Element) -> Option<(String, ResourceType)> {
    let rel = element.attr("rel")?.trim().to_ascii_lowercase();
    let kind = match rel.as_str() {
        "stylesheet" => ResourceType::Stylesheet,
        "icon" | "shortcut icon" | "apple-touch-icon-precomposed" => ResourceType::Image,
        _ => return None,
    };
    Some((element.attr("href")?.to_string(), kind))
}

fn src_reference(element: &Element, kind: ResourceType) -> Option<(String, ResourceType)> {
    Some((element.attr("src")?.to_string(), kind))
}
