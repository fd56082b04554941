//! The layered output buffer.
//!
//! Output is split into four regions that are concatenated in order
//! when a program is materialized:
//!
//!   Head  type declarations and signatures
//!   Neck  imports, runtime helpers and instantiated functions
//!   Body  statements of the program entry
//!   Tail  trailing synthesized code
//!
//! Function bodies are compiled into a scratch buffer pushed with
//! [`BufferStack::flip`] and merged back with [`BufferStack::dump`] or
//! [`BufferStack::dump_to_head`], so a signature only known once its
//! body is compiled still lands in front of that body.

use tracing::trace;

use crate::backend::{Backend, Code, Targets};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Head,
    Neck,
    Body,
    Tail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    head: Code,
    neck: Code,
    body: Code,
    tail: Code,
}

impl Buffer {
    pub fn new(targets: Targets) -> Self {
        Self {
            head: Code::empty(targets),
            neck: Code::empty(targets),
            body: Code::empty(targets),
            tail: Code::empty(targets),
        }
    }

    pub fn region(&self, region: Region) -> &Code {
        match region {
            Region::Head => &self.head,
            Region::Neck => &self.neck,
            Region::Body => &self.body,
            Region::Tail => &self.tail,
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut Code {
        match region {
            Region::Head => &mut self.head,
            Region::Neck => &mut self.neck,
            Region::Body => &mut self.body,
            Region::Tail => &mut self.tail,
        }
    }

    pub fn write(&mut self, region: Region, code: &Code) {
        self.region_mut(region).append(code);
    }

    pub fn write_str(&mut self, region: Region, backend: Backend, text: &str) {
        self.region_mut(region).push_str(backend, text);
    }

    /// Appends another buffer region by region.
    pub fn append(&mut self, other: &Buffer) {
        self.head.append(&other.head);
        self.neck.append(&other.neck);
        self.body.append(&other.body);
        self.tail.append(&other.tail);
    }

    /// Concatenation of all four regions for one backend.
    pub fn concat(&self, backend: Backend) -> String {
        [&self.head, &self.neck, &self.body, &self.tail]
            .iter()
            .map(|code| code.as_str(backend))
            .collect()
    }
}

/// Proof that a buffer was flipped. It has to be handed back to
/// [`BufferStack::dump`] or [`BufferStack::dump_to_head`].
#[must_use = "a flipped buffer must be dumped"]
#[derive(Debug)]
pub struct FlipHandle {
    depth: usize,
}

#[derive(Debug)]
pub struct BufferStack {
    current: Buffer,
    saved: Vec<Buffer>,
}

impl BufferStack {
    pub fn new(targets: Targets) -> Self {
        Self {
            current: Buffer::new(targets),
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> &Buffer {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Buffer {
        &mut self.current
    }

    /// Number of flipped buffers waiting to be dumped.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Push the current buffer and continue writing into a fresh one.
    pub fn flip(&mut self) -> FlipHandle {
        let targets = self.current.head.targets();
        let previous = std::mem::replace(&mut self.current, Buffer::new(targets));
        self.saved.push(previous);
        trace!(depth = self.saved.len(), "buffer flipped");
        FlipHandle {
            depth: self.saved.len(),
        }
    }

    /// The buffer that was current when `handle` was flipped.
    pub fn saved(&self, handle: &FlipHandle) -> &Buffer {
        &self.saved[handle.depth - 1]
    }

    /// Restores the flipped buffer and returns the scratch one.
    fn pop(&mut self, handle: FlipHandle) -> Buffer {
        assert_eq!(
            handle.depth,
            self.saved.len(),
            "flipped buffers must be dumped innermost first"
        );
        let targets = self.current.head.targets();
        let restored = self.saved.pop().unwrap_or_else(|| Buffer::new(targets));
        trace!(depth = self.saved.len(), "buffer dumped");
        std::mem::replace(&mut self.current, restored)
    }

    /// Pop the scratch buffer, merging every region into the same region
    /// of the restored buffer.
    pub fn dump(&mut self, handle: FlipHandle) {
        let scratch = self.pop(handle);
        self.current.append(&scratch);
    }

    /// Like [`dump`](Self::dump), except the scratch Body lands in the
    /// restored Neck, right behind `prefix`.
    pub fn dump_to_head(&mut self, handle: FlipHandle, prefix: Option<&Code>) {
        let scratch = self.pop(handle);
        self.current.head.append(&scratch.head);
        self.current.neck.append(&scratch.neck);
        if let Some(prefix) = prefix {
            self.current.neck.append(prefix);
        }
        self.current.neck.append(&scratch.body);
        self.current.tail.append(&scratch.tail);
    }

    /// The root buffer. Every flip must have been dumped.
    pub fn into_buffer(self) -> Buffer {
        debug_assert!(self.saved.is_empty(), "undumped buffers at end of compile");
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Targets {
        Targets::only(Backend::Go)
    }

    #[test]
    fn dump_merges_regions() {
        let mut stack = BufferStack::new(targets());
        stack
            .current_mut()
            .write(Region::Body, &Code::text(targets(), "outer\n"));
        let handle = stack.flip();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.saved(&handle).region(Region::Body).as_str(Backend::Go), "outer\n");
        stack
            .current_mut()
            .write(Region::Body, &Code::text(targets(), "inner\n"));
        stack.dump(handle);
        assert_eq!(
            stack.current().region(Region::Body).as_str(Backend::Go),
            "outer\ninner\n"
        );
    }

    #[test]
    fn dump_to_head_places_prefix_before_body() {
        let mut stack = BufferStack::new(targets());
        let handle = stack.flip();
        stack.current_mut().write(Region::Neck, &Code::text(targets(), "helper\n"));
        stack.current_mut().write(Region::Body, &Code::text(targets(), "\treturn 1\n}\n"));
        let signature = Code::text(targets(), "func f() int {\n");
        stack.dump_to_head(handle, Some(&signature));
        let buffer = stack.into_buffer();
        let neck = buffer.region(Region::Neck).as_str(Backend::Go);
        assert_eq!(neck, "helper\nfunc f() int {\n\treturn 1\n}\n");
        let body_start = neck.find("return").unwrap();
        assert!(neck.find("func f").unwrap() < body_start);
        assert!(buffer.region(Region::Body).is_empty());
    }

    #[test]
    fn nested_flips_unwind_in_order() {
        let mut stack = BufferStack::new(targets());
        let outer = stack.flip();
        let inner = stack.flip();
        stack.current_mut().write(Region::Body, &Code::text(targets(), "b"));
        stack.dump(inner);
        stack.dump(outer);
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current().concat(Backend::Go), "b");
    }

    #[test]
    #[should_panic(expected = "innermost first")]
    fn dumping_out_of_order_panics() {
        let mut stack = BufferStack::new(targets());
        let outer = stack.flip();
        let _inner = stack.flip();
        stack.dump(outer);
    }
}
