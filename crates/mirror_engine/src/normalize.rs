use ego_tree::{NodeId, NodeRef};
use mirror_core::{path_segment, ATTACHMENTS_DIR};
use scraper::node::Node;
use scraper::Html;

/// Vendor element wrapping an embedded image.
pub const EMBEDDED_IMAGE_TAG: &str = "ac:image";

/// Attributes that name the attachment an embedded image refers to.
pub const FILENAME_ATTRIBUTES: &[&str] = &["ri:filename"];

/// Replace every embedded-image construct that names an attachment with a
/// plain `<img>` followed by `<br>`. Constructs without a usable filename stay
/// as they are.
///
/// The reference uses the same segment sanitization as the attachment
/// download, so it points at the file actually written.
///
/// Returns the number of constructs replaced.
pub fn normalize_document(document: &mut Html) -> usize {
    let constructs: Vec<NodeId> = document
        .tree
        .root()
        .descendants()
        .filter(|node| is_embedded_image(node))
        .map(|node| node.id())
        .collect();

    let mut replaced = 0;
    for id in constructs {
        let Some(filename) = document.tree.get(id).and_then(find_filename) else {
            continue;
        };
        // attachments are stored under their sanitized title
        let stored = path_segment(&filename).into_name();
        let Some((image, line_break)) = image_nodes(&format!("{ATTACHMENTS_DIR}/{stored}")) else {
            continue;
        };
        if let Some(mut construct) = document.tree.get_mut(id) {
            construct.insert_after(line_break);
            construct.insert_before(image);
            construct.detach();
            replaced += 1;
        }
    }
    replaced
}

/// Parse a storage-format fragment, normalize it and serialize it back.
pub fn normalize_markup(markup: &str) -> (String, usize) {
    let mut document = Html::parse_fragment(markup);
    let replaced = normalize_document(&mut document);
    (document.root_element().inner_html(), replaced)
}

fn is_embedded_image(node: &NodeRef<'_, Node>) -> bool {
    matches!(node.value(), Node::Element(element) if element.name() == EMBEDDED_IMAGE_TAG)
}

fn find_filename(construct: NodeRef<'_, Node>) -> Option<String> {
    construct.descendants().skip(1).find_map(|node| match node.value() {
        Node::Element(element) => FILENAME_ATTRIBUTES
            .iter()
            .find_map(|attr| element.attr(attr))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        _ => None,
    })
}

/// Build detached `<img>` and `<br>` nodes by parsing a tiny fragment, so the
/// attribute values go through the regular parser.
fn image_nodes(reference: &str) -> Option<(Node, Node)> {
    let escaped = escape_attribute(reference);
    let fragment = Html::parse_fragment(&format!(r#"<img src="{escaped}" alt="{escaped}"><br>"#));

    let mut image = None;
    let mut line_break = None;
    for node in fragment.tree.root().descendants() {
        if let Node::Element(element) = node.value() {
            match element.name() {
                "img" if image.is_none() => image = Some(node.value().clone()),
                "br" if line_break.is_none() => line_break = Some(node.value().clone()),
                _ => {}
            }
        }
    }
    image.zip(line_break)
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
