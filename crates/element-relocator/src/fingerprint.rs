//! Fingerprint extraction
//!
//! A fingerprint is the durable identity of an element captured when a
//! selector first located it: tag, filtered attributes, a bounded text
//! signature and the structural path from the nearest stable ancestor.
//! Attributes whose values look generated (numeric suffixes, high-entropy
//! tokens, very long values) are dropped so that obfuscation churn does not
//! anchor identity.

use dom_snapshot::{normalize_text, Attribute, NodeRef, PathStep, Selector, TextMode};
use serde::{Deserialize, Serialize};

/// Extraction knobs. Shared by the extractor and by candidate scoring, so a
/// fingerprint and the nodes compared against it are filtered identically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Attribute names never used for identity
    pub attribute_denylist: Vec<String>,
    /// Attribute names that make an ancestor a structural anchor
    pub anchor_attributes: Vec<String>,
    pub max_attribute_len: usize,
    pub min_numeric_suffix: usize,
    pub entropy_min_len: usize,
    pub entropy_bits_threshold: f64,
    /// Characters of normalized text kept verbatim
    pub text_prefix_len: usize,
    /// Ancestors inspected when looking for an anchor
    pub max_anchor_depth: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            attribute_denylist: [
                "style",
                "nonce",
                "data-reactid",
                "data-react-checksum",
                "jsaction",
                "data-csrf",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            anchor_attributes: ["id", "data-testid", "name"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_attribute_len: 64,
            min_numeric_suffix: 2,
            entropy_min_len: 8,
            entropy_bits_threshold: 3.0,
            text_prefix_len: 256,
            max_anchor_depth: 8,
        }
    }
}

/// Bounded text identity: prefix for distance computation, hash of the full
/// normalized text for a fast equality check.
///
/// Deserialization rejects a `char_len` shorter than the prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTextSignature")]
pub struct TextSignature {
    pub prefix: String,
    pub hash: String,
    pub char_len: usize,
}

#[derive(Deserialize)]
struct RawTextSignature {
    prefix: String,
    hash: String,
    char_len: usize,
}

impl TryFrom<RawTextSignature> for TextSignature {
    type Error = String;

    fn try_from(raw: RawTextSignature) -> Result<Self, Self::Error> {
        let prefix_len = raw.prefix.chars().count();
        if raw.char_len < prefix_len {
            return Err(format!(
                "text length {} is shorter than its {}-character prefix",
                raw.char_len, prefix_len
            ));
        }
        Ok(Self {
            prefix: raw.prefix,
            hash: raw.hash,
            char_len: raw.char_len,
        })
    }
}

impl TextSignature {
    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Characters past the stored prefix.
    pub fn tail_len(&self) -> usize {
        self.char_len.saturating_sub(self.prefix.chars().count())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    tag: String,
    attributes: Vec<Attribute>,
    text: TextSignature,
    path: Vec<PathStep>,
    anchor: Option<Attribute>,
    sibling_index: usize,
    sibling_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selector: Option<Selector>,
}

impl Fingerprint {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn text(&self) -> &TextSignature {
        &self.text
    }

    /// Structural path, anchor step first.
    pub fn path(&self) -> &[PathStep] {
        &self.path
    }

    /// Identifying attribute of the path anchor; `None` when rooted at the
    /// document root.
    pub fn anchor(&self) -> Option<&Attribute> {
        self.anchor.as_ref()
    }

    pub fn sibling_index(&self) -> usize {
        self.sibling_index
    }

    pub fn sibling_count(&self) -> usize {
        self.sibling_count
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FingerprintExtractor {
    config: ExtractorConfig,
}

impl FingerprintExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, node: NodeRef<'_>) -> Fingerprint {
        let (path, anchor) = self.structural_path(node);
        Fingerprint {
            tag: node.tag().to_string(),
            attributes: self.filter_attributes(node.attributes()),
            text: self.text_signature(&node.text(TextMode::Raw)),
            path,
            anchor,
            sibling_index: node.sibling_index(),
            sibling_count: node.sibling_count(),
            selector: None,
        }
    }

    /// Fingerprint a node that `selector` just located.
    pub fn extract_with_selector(&self, node: NodeRef<'_>, selector: Selector) -> Fingerprint {
        Fingerprint {
            selector: Some(selector),
            ..self.extract(node)
        }
    }

    /// Path from the nearest stable ancestor, or from the root when none is
    /// found within `max_anchor_depth` levels.
    pub fn structural_path(&self, node: NodeRef<'_>) -> (Vec<PathStep>, Option<Attribute>) {
        for ancestor in node.ancestors().take(self.config.max_anchor_depth) {
            if let Some(attr) = self.anchor_attribute(ancestor) {
                if let Some(path) = node.path_from(ancestor.id()) {
                    return (path, Some(attr));
                }
            }
        }
        let root = node.tree().root();
        let path = node
            .path_from(root.id())
            .unwrap_or_else(|| vec![node.step()]);
        (path, None)
    }

    fn anchor_attribute(&self, node: NodeRef<'_>) -> Option<Attribute> {
        self.config.anchor_attributes.iter().find_map(|name| {
            node.attribute(name)
                .filter(|value| !value.trim().is_empty() && !self.is_volatile(value))
                .map(|value| Attribute::new(name.clone(), value))
        })
    }

    /// Drop denylisted names and volatile values. `class` is filtered per
    /// token.
    pub fn filter_attributes(&self, attributes: &[Attribute]) -> Vec<Attribute> {
        attributes
            .iter()
            .filter(|attr| !self.config.attribute_denylist.contains(&attr.name))
            .filter_map(|attr| {
                if attr.name == "class" {
                    let kept: Vec<&str> = attr
                        .value
                        .split_whitespace()
                        .filter(|token| !self.is_volatile(token))
                        .collect();
                    (!kept.is_empty()).then(|| Attribute::new("class", kept.join(" ")))
                } else if self.is_volatile(&attr.value) {
                    None
                } else {
                    Some(attr.clone())
                }
            })
            .collect()
    }

    pub fn is_volatile(&self, value: &str) -> bool {
        let value = value.trim();
        let len = value.chars().count();
        if len > self.config.max_attribute_len {
            return true;
        }

        let digits = value
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits >= self.config.min_numeric_suffix && digits < len {
            return true;
        }

        len >= self.config.entropy_min_len
            && !value.contains(char::is_whitespace)
            && char_classes(value) >= 3
            && shannon_entropy(value) >= self.config.entropy_bits_threshold
    }

    pub fn text_signature(&self, raw: &str) -> TextSignature {
        let normalized = normalize_text(raw);
        TextSignature {
            prefix: normalized.chars().take(self.config.text_prefix_len).collect(),
            hash: blake3::hash(normalized.as_bytes()).to_hex().to_string(),
            char_len: normalized.chars().count(),
        }
    }
}

fn char_classes(value: &str) -> usize {
    let (mut lower, mut upper, mut digit, mut other) = (false, false, false, false);
    for c in value.chars() {
        match c {
            'a'..='z' => lower = true,
            'A'..='Z' => upper = true,
            '0'..='9' => digit = true,
            _ => other = true,
        }
    }
    [lower, upper, digit, other].iter().filter(|flag| **flag).count()
}

/// Shannon entropy in bits per character.
fn shannon_entropy(value: &str) -> f64 {
    let mut counts: Vec<(char, usize)> = Vec::new();
    let mut total = 0usize;
    for c in value.chars() {
        total += 1;
        match counts.iter_mut().find(|(seen, _)| *seen == c) {
            Some((_, count)) => *count += 1,
            None => counts.push((c, 1)),
        }
    }
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .map(|(_, count)| {
            let p = *count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::{DocumentTree, ElementSpec, NodeId};

    fn tree() -> DocumentTree {
        DocumentTree::from_root(
            ElementSpec::new("html").child(
                ElementSpec::new("body").child(
                    ElementSpec::new("section")
                        .attr("id", "pricing")
                        .child(ElementSpec::new("h2").text("Plans"))
                        .child(
                            ElementSpec::new("div")
                                .attr("class", "amt css-1x9f2kq")
                                .attr("style", "color: red")
                                .attr("data-row", "row-1234")
                                .attr("title", "Monthly price")
                                .text("  $12.00 per   Month "),
                        ),
                ),
            ),
        )
    }

    #[test]
    fn filters_denylisted_and_volatile_attributes() {
        let tree = tree();
        let div = tree.nodes_with_tag("div").next().unwrap();
        let fp = FingerprintExtractor::default().extract(div);
        assert_eq!(
            fp.attributes(),
            &[
                Attribute::new("class", "amt"),
                Attribute::new("title", "Monthly price"),
            ]
        );
    }

    #[test]
    fn volatility_heuristic() {
        let extractor = FingerprintExtractor::default();
        assert!(extractor.is_volatile("ember1234"));
        assert!(extractor.is_volatile("css-1x9f2kq"));
        assert!(extractor.is_volatile(&"a".repeat(65)));
        assert!(!extractor.is_volatile("price"));
        assert!(!extractor.is_volatile("price2"));
        assert!(!extractor.is_volatile("100"));
        assert!(!extractor.is_volatile("product-title"));
        assert!(!extractor.is_volatile("Monthly price"));
    }

    #[test]
    fn path_anchors_at_stable_ancestor() {
        let tree = tree();
        let div = tree.nodes_with_tag("div").next().unwrap();
        let fp = FingerprintExtractor::default().extract(div);
        assert_eq!(
            fp.path(),
            &[PathStep::new("section", 0), PathStep::new("div", 1)]
        );
        assert_eq!(fp.anchor(), Some(&Attribute::new("id", "pricing")));
        assert_eq!(fp.sibling_index(), 1);
        assert_eq!(fp.sibling_count(), 2);
    }

    #[test]
    fn path_falls_back_to_root_beyond_depth_bound() {
        let tree = tree();
        let div = tree.nodes_with_tag("div").next().unwrap();
        let extractor = FingerprintExtractor::new(ExtractorConfig {
            max_anchor_depth: 0,
            ..ExtractorConfig::default()
        });
        let fp = extractor.extract(div);
        assert_eq!(fp.path().len(), 4);
        assert_eq!(fp.path()[0], PathStep::new("html", 0));
        assert!(fp.anchor().is_none());
    }

    #[test]
    fn text_signature_normalizes_and_bounds() {
        let extractor = FingerprintExtractor::new(ExtractorConfig {
            text_prefix_len: 6,
            ..ExtractorConfig::default()
        });
        let sig = extractor.text_signature("  $12.00 per   Month ");
        assert_eq!(sig.prefix, "$12.00");
        assert_eq!(sig.char_len, "$12.00 per month".len());
        assert_eq!(sig.tail_len(), 10);
        assert_eq!(sig, extractor.text_signature("$12.00 PER MONTH"));
        assert_ne!(sig.hash, extractor.text_signature("$12.00 per week").hash);
    }

    #[test]
    fn decoding_rejects_length_shorter_than_prefix() {
        let tree = tree();
        let fp = FingerprintExtractor::default().extract(tree.get(NodeId(4)).unwrap());
        let mut value = serde_json::to_value(&fp).unwrap();
        value["text"]["char_len"] = serde_json::json!(2);
        value["text"]["hash"] = serde_json::json!("deadbeef");

        let err = serde_json::from_value::<Fingerprint>(value).unwrap_err();
        assert!(err.to_string().contains("shorter than"));
        let intact = serde_json::to_value(&fp).unwrap();
        assert_eq!(serde_json::from_value::<Fingerprint>(intact).unwrap(), fp);
    }

    #[test]
    fn tail_len_never_underflows() {
        let sig = TextSignature {
            prefix: "$12.00".into(),
            hash: String::new(),
            char_len: 2,
        };
        assert_eq!(sig.tail_len(), 0);
    }

    #[test]
    fn selector_only_recorded_on_request() {
        let tree = tree();
        let node = tree.get(NodeId(4)).unwrap();
        let extractor = FingerprintExtractor::default();
        assert!(extractor.extract(node).selector().is_none());
        let fp = extractor.extract_with_selector(node, Selector::tag("div"));
        assert_eq!(fp.selector(), Some(&Selector::tag("div")));
    }

    #[test]
    fn root_fingerprint() {
        let tree = tree();
        let fp = FingerprintExtractor::default().extract(tree.root());
        assert_eq!(fp.path(), &[PathStep::new("html", 0)]);
        assert_eq!(fp.sibling_count(), 1);
        assert!(fp.text().is_empty());
    }
}
