//! Optional hierarchical tracing handle passed through stages.

/// A unit of traced work. Children nest under their parent.
pub trait Span: Send + Sync {
    fn start_child(&self, name: &'static str) -> Box<dyn Span>;

    fn finish(self: Box<Self>);
}

/// Span that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

impl Span for NoopSpan {
    fn start_child(&self, _name: &'static str) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }

    fn finish(self: Box<Self>) {}
}

/// Span backed by `tracing`; children become child spans of this one.
#[derive(Debug, Clone)]
pub struct TracingSpan {
    span: tracing::Span,
}

impl TracingSpan {
    pub fn root(name: &'static str) -> Self {
        Self {
            span: tracing::info_span!("deploy", run = name),
        }
    }

    pub fn inner(&self) -> &tracing::Span {
        &self.span
    }
}

impl Span for TracingSpan {
    fn start_child(&self, name: &'static str) -> Box<dyn Span> {
        let span = tracing::info_span!(parent: &self.span, "stage", name = name);
        Box::new(TracingSpan { span })
    }

    fn finish(self: Box<Self>) {
        // Closing happens when the last handle to the span is dropped.
        drop(self.span);
    }
}
