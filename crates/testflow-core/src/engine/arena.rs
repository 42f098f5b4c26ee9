//! Arena de items vivos (iniciados y aún no detenidos), indexados por uuid.
//!
//! Es compartida por todos los flujos; cada flujo sólo toca las claves que
//! su `FlowContext` referencia. Un item sale de la arena en su `stop`, así
//! que cualquier acceso posterior falla con `ItemNotRunning`.
//!
//! Los closures que reciben `&mut` se ejecutan con el shard bloqueado. Una
//! vuelta a la arena desde dentro de uno de ellos falla con `IllegalState`
//! en vez de quedar esperando al lock.
use std::cell::Cell;

use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::LifecycleError;
use crate::model::{ContainerResult, ExecutableItem, FixtureResult, StepResult, TestResult};

thread_local! {
    static IN_MUTATOR: Cell<bool> = const { Cell::new(false) };
}

/// Marca el hilo como "dentro de un closure de la arena" hasta el drop.
struct MutatorGuard;

impl MutatorGuard {
    fn enter() -> Self {
        IN_MUTATOR.with(|m| m.set(true));
        MutatorGuard
    }
}

impl Drop for MutatorGuard {
    fn drop(&mut self) { IN_MUTATOR.with(|m| m.set(false)); }
}

#[derive(Debug)]
pub(crate) enum LiveItem {
    Container(ContainerResult),
    Test(TestResult),
    Fixture(FixtureResult),
    Step { parent: Uuid, step: StepResult },
}

impl LiveItem {
    fn executable_mut(&mut self) -> Option<&mut ExecutableItem> {
        match self {
            LiveItem::Container(_) => None,
            LiveItem::Test(t) => Some(&mut t.item),
            LiveItem::Fixture(f) => Some(&mut f.item),
            LiveItem::Step { step, .. } => Some(&mut step.item),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct LiveArena {
    items: DashMap<Uuid, LiveItem>,
}

impl LiveArena {
    /// Falla si el hilo está dentro de un closure de `with_*`.
    pub fn ensure_not_reentrant(&self) -> Result<(), LifecycleError> {
        if IN_MUTATOR.with(Cell::get) {
            return Err(LifecycleError::illegal("lifecycle called from inside an update closure"));
        }
        Ok(())
    }

    pub fn insert(&self, uuid: Uuid, item: LiveItem) -> Result<(), LifecycleError> {
        self.ensure_not_reentrant()?;
        self.items.insert(uuid, item);
        Ok(())
    }

    /// No llamar desde un closure de `with_*`: bloquea todos los shards.
    pub fn len(&self) -> usize { self.items.len() }

    pub fn contains(&self, uuid: Uuid) -> bool { self.items.contains_key(&uuid) }

    fn with_mut<R>(&self, uuid: Uuid, f: impl FnOnce(&mut LiveItem) -> Option<R>) -> Result<R, LifecycleError> {
        self.ensure_not_reentrant()?;
        let mut entry = self.items.get_mut(&uuid).ok_or(LifecycleError::ItemNotRunning(uuid))?;
        let _guard = MutatorGuard::enter();
        f(entry.value_mut()).ok_or(LifecycleError::ItemNotRunning(uuid))
    }

    pub fn with_container<R>(&self, uuid: Uuid, f: impl FnOnce(&mut ContainerResult) -> R) -> Result<R, LifecycleError> {
        self.with_mut(uuid, |item| match item {
                LiveItem::Container(c) => Some(f(c)),
                _ => None,
            })
    }

    pub fn with_test<R>(&self, uuid: Uuid, f: impl FnOnce(&mut TestResult) -> R) -> Result<R, LifecycleError> {
        self.with_mut(uuid, |item| match item {
                LiveItem::Test(t) => Some(f(t)),
                _ => None,
            })
    }

    pub fn with_fixture<R>(&self, uuid: Uuid, f: impl FnOnce(&mut FixtureResult) -> R) -> Result<R, LifecycleError> {
        self.with_mut(uuid, |item| match item {
                LiveItem::Fixture(fx) => Some(f(fx)),
                _ => None,
            })
    }

    pub fn with_step<R>(&self, uuid: Uuid, f: impl FnOnce(&mut StepResult) -> R) -> Result<R, LifecycleError> {
        self.with_mut(uuid, |item| match item {
                LiveItem::Step { step, .. } => Some(f(step)),
                _ => None,
            })
    }

    /// Acceso a la parte ejecutable de un test, fixture o step.
    pub fn with_executable<R>(&self, uuid: Uuid, f: impl FnOnce(&mut ExecutableItem) -> R) -> Result<R, LifecycleError> {
        self.with_mut(uuid, |item| item.executable_mut().map(f))
    }

    fn take_if(&self, uuid: Uuid, pred: impl FnOnce(&LiveItem) -> bool) -> Result<LiveItem, LifecycleError> {
        self.ensure_not_reentrant()?;
        self.items
            .remove_if(&uuid, |_, item| pred(item))
            .map(|(_, item)| item)
            .ok_or(LifecycleError::ItemNotRunning(uuid))
    }

    pub fn take_container(&self, uuid: Uuid) -> Result<ContainerResult, LifecycleError> {
        match self.take_if(uuid, |i| matches!(i, LiveItem::Container(_)))? {
            LiveItem::Container(c) => Ok(c),
            _ => Err(LifecycleError::ItemNotRunning(uuid)),
        }
    }

    pub fn take_test(&self, uuid: Uuid) -> Result<TestResult, LifecycleError> {
        match self.take_if(uuid, |i| matches!(i, LiveItem::Test(_)))? {
            LiveItem::Test(t) => Ok(t),
            _ => Err(LifecycleError::ItemNotRunning(uuid)),
        }
    }

    pub fn take_fixture(&self, uuid: Uuid) -> Result<FixtureResult, LifecycleError> {
        match self.take_if(uuid, |i| matches!(i, LiveItem::Fixture(_)))? {
            LiveItem::Fixture(f) => Ok(f),
            _ => Err(LifecycleError::ItemNotRunning(uuid)),
        }
    }

    /// Saca un step de la arena junto con el uuid de su padre.
    pub fn take_step(&self, uuid: Uuid) -> Result<(Uuid, StepResult), LifecycleError> {
        match self.take_if(uuid, |i| matches!(i, LiveItem::Step { .. }))? {
            LiveItem::Step { parent, step } => Ok((parent, step)),
            _ => Err(LifecycleError::ItemNotRunning(uuid)),
        }
    }
}
