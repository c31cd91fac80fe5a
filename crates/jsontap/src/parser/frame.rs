use crate::{pointer::PathItem, tree::ContainerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayState {
    /// Just opened: a value or `]`.
    ValueOrEnd,
    /// After a comma: a value.
    Value,
    /// After a value: `,` or `]`.
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectState {
    KeyOrEnd,
    Key,
    Colon,
    Value,
    CommaOrEnd,
}

/// Stack entry, one per open container.
#[derive(Debug, Clone)]
pub(crate) enum Frame {
    Array {
        id: ContainerId,
        state: ArrayState,
        len: usize,
    },
    Object {
        id: ContainerId,
        state: ObjectState,
        pending_key: Option<String>,
    },
}

impl Frame {
    pub(crate) fn new_array(id: ContainerId) -> Self {
        Frame::Array {
            id,
            state: ArrayState::ValueOrEnd,
            len: 0,
        }
    }

    pub(crate) fn new_object(id: ContainerId) -> Self {
        Frame::Object {
            id,
            state: ObjectState::KeyOrEnd,
            pending_key: None,
        }
    }

    pub(crate) fn id(&self) -> ContainerId {
        match self {
            Frame::Array { id, .. } | Frame::Object { id, .. } => *id,
        }
    }

    pub(crate) fn awaits_key(&self) -> bool {
        matches!(
            self,
            Frame::Object {
                state: ObjectState::KeyOrEnd | ObjectState::Key,
                ..
            }
        )
    }

    pub(crate) fn awaits_value(&self) -> bool {
        matches!(
            self,
            Frame::Array {
                state: ArrayState::ValueOrEnd | ArrayState::Value,
                ..
            } | Frame::Object {
                state: ObjectState::Value,
                ..
            }
        )
    }

    /// Whether the closing delimiter may appear now.
    pub(crate) fn may_close(&self) -> bool {
        matches!(
            self,
            Frame::Array {
                state: ArrayState::ValueOrEnd | ArrayState::CommaOrEnd,
                ..
            } | Frame::Object {
                state: ObjectState::KeyOrEnd | ObjectState::CommaOrEnd,
                ..
            }
        )
    }

    pub(crate) fn closing_delimiter(&self) -> char {
        match self {
            Frame::Array { .. } => ']',
            Frame::Object { .. } => '}',
        }
    }

    pub(crate) fn expected(&self) -> &'static str {
        match self {
            Frame::Array { state, .. } => match state {
                ArrayState::ValueOrEnd => "a value or ']'",
                ArrayState::Value => "a value",
                ArrayState::CommaOrEnd => "',' or ']'",
            },
            Frame::Object { state, .. } => match state {
                ObjectState::KeyOrEnd => "a string key or '}'",
                ObjectState::Key => "a string key",
                ObjectState::Colon => "':'",
                ObjectState::Value => "a value",
                ObjectState::CommaOrEnd => "',' or '}'",
            },
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Frame::Array { .. } => "an array",
            Frame::Object { .. } => "an object",
        }
    }
}

/// Open containers, outermost first. Every frame but the root one remembers
/// its slot in the parent, so the stack doubles as the path from the root to
/// the innermost open container.
#[derive(Debug, Clone)]
pub(crate) struct FrameStack {
    root: Option<Frame>,
    stack: Vec<(PathItem, Frame)>,
}

impl Default for FrameStack {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStack {
    pub(crate) fn new() -> Self {
        Self {
            root: None,
            stack: Vec::with_capacity(16),
        }
    }

    pub(crate) fn last(&self) -> Option<&Frame> {
        if let Some((_, frame)) = self.stack.last() {
            return Some(frame);
        }
        self.root.as_ref()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Frame> {
        if let Some((_, frame)) = self.stack.last_mut() {
            Some(frame)
        } else {
            self.root.as_mut()
        }
    }

    /// Pushes `frame`; `slot` is its place in the current innermost
    /// container, or `None` for the document root.
    pub(crate) fn push(&mut self, slot: Option<PathItem>, frame: Frame) {
        match slot {
            Some(slot) => self.stack.push((slot, frame)),
            None => self.root = Some(frame),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Frame> {
        match self.stack.pop() {
            Some((_, f)) => Some(f),
            None => self.root.take(),
        }
    }

    /// Slots leading from the root container to the innermost one.
    pub(crate) fn slots(&self) -> impl Iterator<Item = &PathItem> {
        self.stack.iter().map(|(slot, _)| slot)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of open containers.
    pub(crate) fn depth(&self) -> usize {
        self.stack.len() + usize::from(self.root.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_tracks_slots_below_the_root() {
        let mut frames = FrameStack::new();
        assert!(frames.is_empty());
        frames.push(None, Frame::new_object(ContainerId(0)));
        frames.push(Some(PathItem::from("a")), Frame::new_array(ContainerId(1)));
        frames.push(Some(PathItem::Index(2)), Frame::new_array(ContainerId(2)));

        let slots: Vec<_> = frames.slots().cloned().collect();
        assert_eq!(slots, vec![PathItem::from("a"), PathItem::Index(2)]);
        assert_eq!(frames.last().map(Frame::id), Some(ContainerId(2)));
        assert_eq!(frames.depth(), 3);

        assert_eq!(frames.pop().map(|f| f.id()), Some(ContainerId(2)));
        assert_eq!(frames.pop().map(|f| f.id()), Some(ContainerId(1)));
        assert_eq!(frames.pop().map(|f| f.id()), Some(ContainerId(0)));
        assert!(frames.pop().is_none());
        assert!(frames.is_empty());
        assert_eq!(frames.depth(), 0);
    }

    #[test]
    fn fresh_frames_accept_a_close() {
        let array = Frame::new_array(ContainerId(0));
        assert!(array.may_close() && array.awaits_value());
        let object = Frame::new_object(ContainerId(1));
        assert!(object.may_close() && object.awaits_key());
        assert_eq!(object.expected(), "a string key or '}'");
    }
}
