//! Image elements and the sources that enumerate them
//!
//! An [`ImageElement`] is the loader's view of one `<img>`: its attributes,
//! the source currently assigned to it, and the state of the host's own
//! (native) loading. An [`ElementSource`] hands out a snapshot of the
//! elements present at call time, in document order.

use crate::Error;
use crate::blob::ResourceHandle;
use crate::types::ElementId;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tokio::sync::watch;
use url::Url;

/// State of an element's native loading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeState {
    /// Still loading (or never started)
    Loading,
    /// Finished decoding with the given natural size
    Loaded {
        /// Natural width in pixels
        width: u32,
        /// Natural height in pixels
        height: u32,
    },
    /// Finished with an error
    Errored,
}

impl NativeState {
    /// Whether the element reports itself finished
    pub fn is_finished(&self) -> bool {
        !matches!(self, NativeState::Loading)
    }

    /// Finished with non-zero width and height
    pub fn has_area(&self) -> bool {
        matches!(self, NativeState::Loaded { width, height } if *width > 0 && *height > 0)
    }
}

/// One image element of the page
pub struct ImageElement {
    id: ElementId,
    attributes: BTreeMap<String, String>,
    source: RwLock<Option<String>>,
    native: watch::Sender<NativeState>,
}

impl std::fmt::Debug for ImageElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageElement")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("native", &self.native_state())
            .finish()
    }
}

impl ImageElement {
    /// Create an element with no attributes
    pub fn new(id: impl Into<ElementId>) -> Self {
        Self::with_attributes(id, BTreeMap::new())
    }

    /// Create an element from a parsed attribute map
    ///
    /// A `src` attribute becomes the initially assigned source.
    pub fn with_attributes(id: impl Into<ElementId>, attributes: BTreeMap<String, String>) -> Self {
        let source = attributes.get("src").cloned();
        let (native, _rx) = watch::channel(NativeState::Loading);
        Self {
            id: id.into(),
            attributes,
            source: RwLock::new(source),
            native,
        }
    }

    /// Builder: set an attribute
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if name == "src" {
            *self
                .source
                .get_mut()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(value.to_string());
        }
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Element identifier
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Attribute value as written in the page
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute is present (even if empty)
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Source currently assigned to the element
    pub fn current_source(&self) -> Option<String> {
        self.source
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Point the element at a resolved resource handle
    pub fn assign_source(&self, handle: &ResourceHandle) {
        *self
            .source
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle.object_url().to_string());
    }

    /// Current native loading state
    pub fn native_state(&self) -> NativeState {
        *self.native.borrow()
    }

    /// Host signal: native loading finished with the given natural size
    pub fn finish_native(&self, width: u32, height: u32) {
        self.native
            .send_replace(NativeState::Loaded { width, height });
    }

    /// Host signal: native loading failed
    pub fn fail_native(&self) {
        self.native.send_replace(NativeState::Errored);
    }

    /// Wait until native loading reaches a finished state
    pub async fn wait_native(&self) -> NativeState {
        let mut rx = self.native.subscribe();
        match rx.wait_for(NativeState::is_finished).await {
            Ok(state) => *state,
            // The sender lives in `self`; this only happens if it is being torn down
            Err(_) => NativeState::Errored,
        }
    }
}

/// One element as seen by the registry at snapshot time
#[derive(Clone, Debug)]
pub struct ElementRecord {
    /// The element itself
    pub element: Arc<ImageElement>,
    /// Absolute URL from the marker attribute, if the element carries one
    pub source_url: Option<String>,
}

/// Enumerates the image elements of a page
pub trait ElementSource: Send + Sync {
    /// Elements present right now, in document order
    ///
    /// `marker_attribute` names the attribute that carries a cache-aside URL.
    fn snapshot(&self, marker_attribute: &str) -> Vec<ElementRecord>;
}

/// Element source over a fixed, caller-built list
///
/// Marker URLs are taken as written; callers supply absolute URLs.
#[derive(Default)]
pub struct StaticElements {
    elements: Mutex<Vec<Arc<ImageElement>>>,
}

impl StaticElements {
    /// Source over `elements`
    pub fn new(elements: Vec<Arc<ImageElement>>) -> Self {
        Self {
            elements: Mutex::new(elements),
        }
    }

    /// Append an element, as a script inserting into the page would
    pub fn push(&self, element: Arc<ImageElement>) {
        self.elements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(element);
    }
}

impl ElementSource for StaticElements {
    fn snapshot(&self, marker_attribute: &str) -> Vec<ElementRecord> {
        self.elements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|element| ElementRecord {
                source_url: element.attribute(marker_attribute).map(str::to_string),
                element: element.clone(),
            })
            .collect()
    }
}

#[allow(clippy::expect_used)]
fn img_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<img\b([^>]*)>").expect("static img tag pattern"))
}

#[allow(clippy::expect_used)]
fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("static attribute pattern")
    })
}

/// Element source scanned from an HTML document
///
/// Every `<img>` tag becomes one element. Marker URLs are resolved
/// against the document's base URL so cache keys are always absolute.
pub struct HtmlDocument {
    base: Option<Url>,
    elements: Vec<Arc<ImageElement>>,
}

impl HtmlDocument {
    /// Scan `html` for image tags
    pub fn parse(html: &str, base: Option<Url>) -> Self {
        let elements = img_tag_regex()
            .captures_iter(html)
            .enumerate()
            .map(|(index, tag)| {
                let attrs_text = tag.get(1).map_or("", |m| m.as_str());
                let attributes = parse_attributes(attrs_text);
                let id = attributes
                    .get("id")
                    .filter(|id| !id.is_empty())
                    .map(|id| ElementId::new(id.as_str()))
                    .unwrap_or_else(|| ElementId::positional(index));
                Arc::new(ImageElement::with_attributes(id, attributes))
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = elements.len(), "scanned image tags");
        Self { base, elements }
    }

    /// All scanned elements in document order
    pub fn elements(&self) -> &[Arc<ImageElement>] {
        &self.elements
    }

    /// Find an element by identifier
    pub fn element(&self, id: &str) -> Option<&Arc<ImageElement>> {
        self.elements.iter().find(|e| e.id().as_str() == id)
    }

    fn resolve(&self, raw: &str) -> String {
        let Some(base) = &self.base else {
            return raw.to_string();
        };
        match base.join(raw) {
            Ok(url) => url.to_string(),
            Err(e) => {
                let error = Error::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(code = error.error_code(), error = %error, "keeping marker URL as written");
                raw.to_string()
            }
        }
    }
}

impl ElementSource for HtmlDocument {
    fn snapshot(&self, marker_attribute: &str) -> Vec<ElementRecord> {
        self.elements
            .iter()
            .map(|element| ElementRecord {
                source_url: element
                    .attribute(marker_attribute)
                    .map(|raw| self.resolve(raw)),
                element: element.clone(),
            })
            .collect()
    }
}

fn parse_attributes(text: &str) -> BTreeMap<String, String> {
    attribute_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| decode_entities(m.as_str()));
            Some((name, value))
        })
        .collect()
}

// Only the entities that show up in attribute URLs; `&amp;` goes last so
// its output is never decoded again
fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
