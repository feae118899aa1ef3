//! Backtracking frames.
//!
//! A [`Stack`] is a chain of frames rooted at a permanently suspended root.
//! Each frame above the root is one matching attempt that will eventually be
//! accepted (merged into its parent) or rejected (thrown away). Only the top
//! frame may be branched, accepted or rejected.
//!
//! The stack is generic over its payload so the same rules serve the lexical
//! level ([`LexicalState`](crate::lexical::LexicalState)), the syntactic level
//! driven by the interpreter, and the reference tree builder's undo journals.
//!
//! ```text
//! suspended --branch--> (new child: active; self remains suspended)
//! active    --accept--> accepted (parent becomes current)
//! active    --reject--> rejected (parent becomes current)
//! ```

use crate::Error;

/// Payload carried by a frame.
pub trait Checkpoint: Sized {
    /// Copy of this state for a new child attempt.
    fn fork(&self) -> Self;

    /// Folds an accepted child back into this state.
    fn merge(&mut self, child: Self);

    /// Releases a rejected state.
    #[inline]
    fn discard(self) {}
}

/// Handle to a frame. Handles are never reused within one stack.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Suspended,
    Active,
    Accepted,
    Rejected,
}

impl Status {
    /// Whether a frame in this status has been retired.
    #[inline]
    pub fn is_retired(self) -> bool {
        matches!(self, Status::Accepted | Status::Rejected)
    }
}

#[derive(Debug, Clone, Copy)]
struct Meta {
    id: FrameId,
    status: Status,
    parent: Option<FrameId>,
    depth: usize,
}

/// A chain of checkpoint frames over a root payload.
///
/// Metadata is kept for the live chain and for the most recently retired
/// frame. Older retired handles are forgotten, so a long run of branches
/// that are each accepted or rejected uses constant space.
#[derive(Debug)]
pub struct Stack<P> {
    root: P,
    /// Live payloads above the root, innermost last.
    chain: Vec<P>,
    /// Metadata of the root followed by `chain`, index for index.
    live: Vec<Meta>,
    retired: Option<Meta>,
    next: usize,
}

impl<P: Checkpoint> Stack<P> {
    pub fn new(root: P) -> Self {
        Self {
            root,
            chain: Vec::new(),
            live: vec![Meta {
                id: FrameId::ROOT,
                status: Status::Suspended,
                parent: None,
                depth: 0,
            }],
            retired: None,
            next: 1,
        }
    }

    /// The frame currently on top.
    #[inline]
    pub fn top(&self) -> FrameId {
        self.live.last().map_or(FrameId::ROOT, |m| m.id)
    }

    /// Number of live frames above the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Payload of the top frame.
    #[inline]
    pub fn current(&self) -> &P {
        self.chain.last().unwrap_or(&self.root)
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut P {
        match self.chain.last_mut() {
            Some(payload) => payload,
            None => &mut self.root,
        }
    }

    fn meta(&self, id: FrameId) -> Option<&Meta> {
        match self.live.binary_search_by_key(&id, |m| m.id) {
            Ok(idx) => self.live.get(idx),
            Err(_) => self.retired.as_ref().filter(|m| m.id == id),
        }
    }

    /// Status of a live frame or of the frame retired last.
    pub fn status(&self, id: FrameId) -> Option<Status> {
        self.meta(id).map(|m| m.status)
    }

    pub fn parent(&self, id: FrameId) -> Option<FrameId> {
        self.meta(id).and_then(|m| m.parent)
    }

    pub fn depth_of(&self, id: FrameId) -> Option<usize> {
        self.meta(id).map(|m| m.depth)
    }

    fn ensure_top(&self, id: FrameId, op: &'static str) -> Result<(), Error> {
        let live = matches!(self.status(id), Some(Status::Active | Status::Suspended));
        if id == self.top() && live {
            Ok(())
        } else {
            Err(Error::NotOnTop { op })
        }
    }

    fn set_status(&mut self, status: Status) {
        if let Some(meta) = self.live.last_mut() {
            meta.status = status;
        }
    }

    /// Starts a new attempt on top of `id`.
    pub fn branch(&mut self, id: FrameId) -> Result<FrameId, Error> {
        self.ensure_top(id, "branch")?;

        let child = self.current().fork();
        let next = FrameId(self.next);
        self.next += 1;

        self.set_status(Status::Suspended);
        self.live.push(Meta {
            id: next,
            status: Status::Active,
            parent: Some(id),
            depth: self.chain.len() + 1,
        });
        self.chain.push(child);

        Ok(next)
    }

    /// Merges `id` into its parent and returns the parent.
    pub fn accept(&mut self, id: FrameId) -> Result<FrameId, Error> {
        if id == FrameId::ROOT {
            return Err(Error::AcceptedRoot);
        }
        let (child, parent) = self.retire(id, "accept", Status::Accepted)?;
        self.current_mut().merge(child);
        Ok(parent)
    }

    /// Discards `id` and returns its parent.
    pub fn reject(&mut self, id: FrameId) -> Result<FrameId, Error> {
        if id == FrameId::ROOT {
            return Err(Error::RejectedRoot);
        }
        let (child, parent) = self.retire(id, "reject", Status::Rejected)?;
        child.discard();
        Ok(parent)
    }

    fn retire(&mut self, id: FrameId, op: &'static str, status: Status) -> Result<(P, FrameId), Error> {
        self.ensure_top(id, op)?;

        let (Some(child), Some(mut meta)) = (self.chain.pop(), self.live.pop()) else {
            return Err(Error::NotOnTop { op });
        };
        meta.status = status;
        self.retired = Some(meta);

        let parent = meta.parent.unwrap_or(FrameId::ROOT);
        if parent != FrameId::ROOT {
            self.set_status(Status::Active);
        }
        Ok((child, parent))
    }
}
