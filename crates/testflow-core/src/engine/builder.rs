//! Builder para `Lifecycle`.
//!
//! Permite registrar listeners antes de construir el engine; una vez
//! construido, el engine se comparte por referencia entre flujos.

use crate::engine::Lifecycle;
use crate::event::{CompositeListener, LifecycleListener};
use crate::sink::ResultSink;

pub struct LifecycleBuilder<S: ResultSink> {
    sink: S,
    listeners: Vec<Box<dyn LifecycleListener>>,
}

impl<S: ResultSink> LifecycleBuilder<S> {
    pub fn new(sink: S) -> Self {
        Self { sink,
               listeners: Vec::new() }
    }

    /// Añade un listener; se notifican en el orden de registro.
    #[inline]
    pub fn listener(mut self, listener: impl LifecycleListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    #[inline]
    pub fn build(self) -> Lifecycle<S> { Lifecycle::with_listeners(self.sink, CompositeListener::with_listeners(self.listeners)) }
}
