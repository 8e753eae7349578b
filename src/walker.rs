use crate::document::{Document, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEvent {
    /// First visit of a node, before any of its children.
    Start,
    /// All children of the node have been visited.
    End,
    /// The root has ended. Repeats forever once reached.
    Eof,
}

/// Resumable depth-first walk over a document, using an explicit stack of
/// `(node, next child index)` pairs instead of recursion.
///
/// Every node produces a `Start` and a matching `End`; after the root's `End`, the walker
/// produces `(root, Eof)` on every further call. This is the same order the decoder consumes
/// nodes in, so the encoder can follow it to lay out the node segment.
#[derive(Clone, Debug)]
pub struct TreeWalker<'a> {
    doc: &'a Document,
    root: NodeId,
    stack: Vec<(NodeId, usize)>,
    started: bool,
    eof: bool,
    finished: bool,
}

impl<'a> TreeWalker<'a> {
    pub fn new(doc: &'a Document, root: NodeId) -> Self {
        Self {
            doc,
            root,
            stack: Vec::new(),
            started: false,
            eof: false,
            finished: false,
        }
    }

    /// Take one step.
    pub fn walk(&mut self) -> (NodeId, WalkEvent) {
        if self.eof {
            return (self.root, WalkEvent::Eof);
        }
        if !self.started {
            self.started = true;
            self.stack.push((self.root, 0));
            return (self.root, WalkEvent::Start);
        }
        let doc = self.doc;
        match self.stack.last_mut() {
            None => {
                self.eof = true;
                (self.root, WalkEvent::Eof)
            }
            Some((node, next)) => {
                let node = *node;
                match doc.children(node).get(*next) {
                    Some(&child) => {
                        *next += 1;
                        self.stack.push((child, 0));
                        (child, WalkEvent::Start)
                    }
                    None => {
                        self.stack.pop();
                        (node, WalkEvent::End)
                    }
                }
            }
        }
    }
}

/// Yields the same steps as [`TreeWalker::walk`], stopping after the first `Eof`.
impl<'a> Iterator for TreeWalker<'a> {
    type Item = (NodeId, WalkEvent);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let step = self.walk();
        if step.1 == WalkEvent::Eof {
            self.finished = true;
        }
        Some(step)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use WalkEvent::*;

    fn tags(doc: &Document) -> Vec<(String, WalkEvent)> {
        doc.walk()
            .unwrap()
            .map(|(id, ev)| (doc.node(id).tag().to_string(), ev))
            .collect()
    }

    #[test]
    fn order() {
        let mut doc = Document::new();
        let a = doc.create_root("a");
        let b = doc.add_child(a, "b");
        doc.add_child(b, "c");
        doc.add_child(b, "d");
        doc.add_child(a, "e");

        let expected: Vec<(String, WalkEvent)> = vec![
            ("a", Start),
            ("b", Start),
            ("c", Start),
            ("c", End),
            ("d", Start),
            ("d", End),
            ("b", End),
            ("e", Start),
            ("e", End),
            ("a", End),
            ("a", Eof),
        ]
        .into_iter()
        .map(|(t, e)| (t.to_string(), e))
        .collect();
        assert_eq!(tags(&doc), expected);
    }

    #[test]
    fn single_node() {
        let mut doc = Document::new();
        let root = doc.create_root("only");
        let mut walker = doc.walk().unwrap();
        assert_eq!(walker.walk(), (root, Start));
        assert_eq!(walker.walk(), (root, End));
        assert_eq!(walker.walk(), (root, Eof));
    }

    #[test]
    fn eof_repeats() {
        let mut doc = Document::new();
        let root = doc.create_root("r");
        doc.add_child(root, "x");
        let mut walker = doc.walk().unwrap();
        for _ in 0..4 {
            walker.walk();
        }
        for _ in 0..3 {
            assert_eq!(walker.walk(), (root, Eof));
        }
    }

    #[test]
    fn iterator_stops_after_eof() {
        let mut doc = Document::new();
        let root = doc.create_root("r");
        doc.add_child(root, "x");
        let steps: Vec<_> = doc.walk().unwrap().collect();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps.last(), Some(&(root, Eof)));
        assert!(Document::new().walk().is_none());
    }

    #[test]
    fn deep_tree_without_recursion() {
        let mut doc = Document::new();
        let mut cur = doc.create_root("n");
        for _ in 0..100_000 {
            cur = doc.add_child(cur, "n");
        }
        let mut walker = doc.walk().unwrap();
        let mut open = 0usize;
        let mut max_open = 0;
        let mut steps = 0;
        loop {
            match walker.walk().1 {
                Start => open += 1,
                End => open -= 1,
                Eof => break,
            }
            max_open = max_open.max(open);
            steps += 1;
        }
        assert_eq!(steps, 2 * 100_001);
        assert_eq!(max_open, 100_001);
    }
}
