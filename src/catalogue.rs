//! An append-only singly linked collection of
//! `(name, absolute fragment offset, record number)` built up by the
//! scanner, with an ordered print operation.

use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct CatalogueEntry {
    pub name: Option<String>,
    pub fragment_offset: u64,
    pub record_number: u32,
}

struct Node {
    entry: CatalogueEntry,
    next: Option<usize>,
}

/// An append-only singly linked list backed by an arena (`nodes`) so that
/// `append` stays O(1) without raw pointers: `tail` is just an index into
/// `nodes`, updated to the newly pushed entry each time.
#[derive(Default)]
pub struct Catalogue {
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub fn append(&mut self, name: Option<String>, fragment_offset: u64, record_number: u32) {
        let index = self.nodes.len();
        self.nodes.push(Node {
            entry: CatalogueEntry {
                name,
                fragment_offset,
                record_number,
            },
            next: None,
        });

        if let Some(tail) = self.tail {
            self.nodes[tail].next = Some(index);
        } else {
            self.head = Some(index);
        }
        self.tail = Some(index);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> CatalogueIter<'_> {
        CatalogueIter {
            nodes: &self.nodes,
            next: self.head,
        }
    }

    pub fn print_all(&self, sink: &mut dyn Write) -> io::Result<()> {
        for entry in self.iter() {
            writeln!(
                sink,
                "{:>10}  {}",
                entry.record_number,
                entry.name.as_deref().unwrap_or("(unnamed)")
            )?;
        }
        Ok(())
    }

    pub fn write_csv(&self, sink: impl Write) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(["record_number", "name", "fragment_offset"])?;
        for entry in self.iter() {
            writer.write_record(&[
                entry.record_number.to_string(),
                entry.name.clone().unwrap_or_default(),
                entry.fragment_offset.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub struct CatalogueIter<'a> {
    nodes: &'a [Node],
    next: Option<usize>,
}

impl<'a> Iterator for CatalogueIter<'a> {
    type Item = &'a CatalogueEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let node = &self.nodes[index];
        self.next = node.next;
        Some(&node.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut catalogue = Catalogue::new();
        catalogue.append(Some("a.txt".into()), 100, 5);
        catalogue.append(None, 200, 6);
        catalogue.append(Some("b.txt".into()), 300, 7);

        let names: Vec<_> = catalogue
            .iter()
            .map(|e| e.name.clone().unwrap_or_else(|| "(unnamed)".into()))
            .collect();
        assert_eq!(names, vec!["a.txt", "(unnamed)", "b.txt"]);
        assert_eq!(catalogue.len(), 3);
    }

    #[test]
    fn print_all_renders_null_names() {
        let mut catalogue = Catalogue::new();
        catalogue.append(None, 0, 42);
        let mut out = Vec::new();
        catalogue.print_all(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(unnamed)"));
        assert!(text.contains("42"));
    }

    #[test]
    fn write_csv_round_trips_entries() {
        let mut catalogue = Catalogue::new();
        catalogue.append(Some("hello.txt".into()), 4096, 12);
        let mut out = Vec::new();
        catalogue.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hello.txt"));
        assert!(text.contains("12"));
        assert!(text.contains("4096"));
    }
}
