//! Human-readable rendering helpers.

use crate::resolution::Slot;

/// Left pad every line of `text` with `width` spaces.
pub fn lpad(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a slot without resolving anything: pending references are shown
/// as references.
pub fn render_slot(slot: &Slot) -> String {
    match slot {
        Slot::Value(value) => value.to_string(),
        Slot::Ref(reference) => reference.to_string(),
        Slot::Entity(entity) => entity.render(),
        Slot::List(items) => {
            if items.is_empty() {
                return "[]".to_string();
            }
            let body: Vec<String> = items.iter().map(render_slot).collect();
            format!("[\n{}\n]", lpad(&body.join("\n"), 2))
        }
        Slot::Map(entries) => {
            if entries.is_empty() {
                return "{}".to_string();
            }
            let body: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}={}", k, render_slot(v)))
                .collect();
            format!("{{\n{}\n}}", lpad(&body.join("\n"), 2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Reference, RefId};

    #[test]
    fn lpad_multiline() {
        assert_eq!(lpad("a\nb", 2), "  a\n  b");
        assert_eq!(lpad("", 4), "");
    }

    #[test]
    fn pending_reference_rendered_as_reference() {
        let slot = Slot::List(vec![Slot::Ref(Reference::to(RefId(3)))]);
        assert_eq!(render_slot(&slot), "[\n  Reference(ref_id=3)\n]");
    }
}
