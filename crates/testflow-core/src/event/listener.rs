use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::LifecycleEvent;

/// Observador de transiciones del lifecycle.
///
/// Se invoca de forma síncrona desde el flujo que hizo la transición, fuera
/// de cualquier préstamo del contexto. Un listener no debe asumir que los
/// eventos de flujos distintos llegan ordenados entre sí.
pub trait LifecycleListener: Send + Sync + std::fmt::Debug {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<T: LifecycleListener + ?Sized> LifecycleListener for Arc<T> {
    fn on_event(&self, event: &LifecycleEvent) { (**self).on_event(event) }
}

/// Aplica una serie de listeners en el orden en que se registraron.
#[derive(Debug, Default)]
pub struct CompositeListener {
    pub listeners: Vec<Box<dyn LifecycleListener>>,
}

impl CompositeListener {
    pub fn new() -> Self { Self { listeners: vec![] } }

    pub fn with_listeners(listeners: Vec<Box<dyn LifecycleListener>>) -> Self { Self { listeners } }

    pub fn push(&mut self, listener: Box<dyn LifecycleListener>) { self.listeners.push(listener); }

    pub fn is_empty(&self) -> bool { self.listeners.is_empty() }

    pub fn notify(&self, event: &LifecycleEvent) {
        for l in self.listeners.iter() {
            l.on_event(event);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub seq: u64, // orden de llegada al log
    pub event: LifecycleEvent,
}

/// Log append-only en memoria. Pensado para tests y diagnósticos.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    inner: Mutex<Vec<RecordedEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self { Self::default() }

    fn entries(&self) -> MutexGuard<'_, Vec<RecordedEvent>> { self.inner.lock().unwrap_or_else(|e| e.into_inner()) }

    pub fn events(&self) -> Vec<RecordedEvent> { self.entries().clone() }

    pub fn len(&self) -> usize { self.entries().len() }

    pub fn is_empty(&self) -> bool { self.entries().is_empty() }

    /// Eventos emitidos mientras `test` era el test activo.
    pub fn for_test(&self, test: Uuid) -> Vec<LifecycleEvent> {
        self.entries()
            .iter()
            .filter(|r| r.event.test == Some(test))
            .map(|r| r.event.clone())
            .collect()
    }

    /// Secuencia compacta de códigos para `test` (ver `LifecycleEventKind::code`).
    pub fn codes_for(&self, test: Uuid) -> Vec<&'static str> { self.for_test(test).iter().map(|e| e.kind.code()).collect() }
}

impl LifecycleListener for InMemoryEventLog {
    fn on_event(&self, event: &LifecycleEvent) {
        let mut entries = self.entries();
        let seq = entries.len() as u64;
        entries.push(RecordedEvent { seq,
                                     event: event.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LifecycleEventKind;

    #[derive(Debug, Default)]
    struct Counter(Mutex<usize>);

    impl LifecycleListener for Counter {
        fn on_event(&self, _event: &LifecycleEvent) { *self.0.lock().unwrap() += 1; }
    }

    #[test]
    fn composite_notifies_in_order_and_log_assigns_seq() {
        let log = Arc::new(InMemoryEventLog::new());
        let counter = Arc::new(Counter::default());
        let composite = CompositeListener::with_listeners(vec![Box::new(counter.clone()), Box::new(log.clone())]);

        let test = Uuid::new_v4();
        composite.notify(&LifecycleEvent::new(Some(test), LifecycleEventKind::TestStarted { uuid: test, name: "t".into() }));
        composite.notify(&LifecycleEvent::new(None, LifecycleEventKind::ContainerStopped { uuid: Uuid::new_v4() }));

        assert_eq!(*counter.0.lock().unwrap(), 2);
        let events = log.events();
        assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(log.codes_for(test), vec!["T+"]);
    }
}
