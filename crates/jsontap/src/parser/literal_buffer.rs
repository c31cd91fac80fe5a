use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    Null,
    True,
    False,
}

impl Literal {
    fn value(self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::True => Value::Boolean(true),
            Literal::False => Value::Boolean(false),
        }
    }
}

/// What happened after feeding one more character into the literal matcher?
#[derive(Debug, PartialEq)]
pub(crate) enum Step {
    /// Character matched, but the literal is not finished yet.
    NeedMore,
    /// Character matched *and* completed the literal.
    Done(Value),
    /// Character did **not** match the expected byte.
    Reject,
}

/// Remaining bytes of the literal being matched, if any.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct ExpectedLiteralBuffer(Option<(&'static [u8], Literal)>);

impl ExpectedLiteralBuffer {
    pub(crate) fn none() -> Self {
        ExpectedLiteralBuffer(None)
    }

    /// Start matching after the first character (`n`, `t`, or `f`).
    pub(crate) fn new(first: char) -> Self {
        match first {
            'n' => ExpectedLiteralBuffer(Some((b"ull", Literal::Null))),
            't' => ExpectedLiteralBuffer(Some((b"rue", Literal::True))),
            'f' => ExpectedLiteralBuffer(Some((b"alse", Literal::False))),
            _ => ExpectedLiteralBuffer::none(),
        }
    }

    pub(crate) fn step(&mut self, c: char) -> Step {
        let Some((bytes, kind)) = self.0.take() else {
            return Step::Reject;
        };

        match bytes.split_first() {
            Some((&b, rest)) if char::from(b) == c => {
                if rest.is_empty() {
                    Step::Done(kind.value())
                } else {
                    self.0 = Some((rest, kind));
                    Step::NeedMore
                }
            }
            _ => Step::Reject,
        }
    }
}
